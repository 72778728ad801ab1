/// Collapses concurrent requests for the same key into a single execution of
/// the given work; every caller observes a clone of the one outcome. The work
/// runs in a dedicated tokio task, so a waiter that withdraws (drops its
/// future) never aborts the load for the remaining waiters. The per-key
/// marker is removed once the work settles, so a later request starts fresh.
pub struct Singleflight<K, T>
where
    K: std::cmp::Eq + std::hash::Hash + Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    flights: std::sync::Arc<FlightMap<K, T>>,
}

type FlightMap<K, T> =
    parking_lot::Mutex<std::collections::HashMap<K, std::sync::Arc<Flight<T>>>>;

struct Flight<T> {
    done: tokio::sync::Notify,
    outcome: once_cell::sync::OnceCell<T>,
}

impl<K, T> Default for Singleflight<K, T>
where
    K: std::cmp::Eq + std::hash::Hash + Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Singleflight::new()
    }
}

impl<K, T> Clone for Singleflight<K, T>
where
    K: std::cmp::Eq + std::hash::Hash + Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Singleflight {
            flights: self.flights.clone(),
        }
    }
}

impl<K, T> std::fmt::Debug for Singleflight<K, T>
where
    K: std::cmp::Eq + std::hash::Hash + Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Singleflight").finish()
    }
}

impl<K, T> Singleflight<K, T>
where
    K: std::cmp::Eq + std::hash::Hash + Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Singleflight<K, T> {
        Singleflight {
            flights: Default::default(),
        }
    }

    pub async fn run<W, F>(&self, key: K, work: W) -> T
    where
        W: FnOnce() -> F,
        F: std::future::Future<Output = T> + Send + 'static,
    {
        let (flight, leader) = {
            let mut flights = self.flights.lock();
            match flights.get(&key) {
                Some(flight) => (flight.clone(), false),
                None => {
                    let flight = std::sync::Arc::new(Flight {
                        done: tokio::sync::Notify::new(),
                        outcome: once_cell::sync::OnceCell::new(),
                    });
                    flights.insert(key.clone(), flight.clone());
                    (flight, true)
                }
            }
        };

        if leader {
            let fut = work();
            let handle = tokio::spawn({
                let flight = flight.clone();
                async move {
                    let value = fut.await;
                    if flight.outcome.set(value).is_err() {
                        panic!("singleflight outcome was already set");
                    }
                }
            });
            tokio::spawn(settle(self.flights.clone(), key, flight.clone(), handle));
        }

        // Register for the wakeup before checking the outcome, otherwise a
        // notify_waiters between the check and the await would be lost.
        let mut wait = std::pin::pin!(flight.done.notified());
        wait.as_mut().enable();
        if let Some(value) = flight.outcome.get() {
            return value.clone();
        }
        wait.await;
        flight
            .outcome
            .get()
            .cloned()
            .expect("singleflight settled without an outcome - perhaps work has panicked")
    }
}

async fn settle<K, T>(
    flights: std::sync::Arc<FlightMap<K, T>>,
    key: K,
    flight: std::sync::Arc<Flight<T>>,
    handle: tokio::task::JoinHandle<()>,
) where
    K: std::cmp::Eq + std::hash::Hash + Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    let joined = handle.await;
    flights.lock().remove(&key);
    flight.done.notify_waiters();
    if let Err(e) = joined {
        if e.is_panic() {
            std::panic::resume_unwind(e.into_panic());
        }
        panic!("singleflight work task aborted");
    }
}
