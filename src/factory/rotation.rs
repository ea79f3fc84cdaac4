//! Rotation phase: shuffle the sealed snapshot once, then replay it forever

use rand::seq::SliceRandom;
use rand::Rng;
use tokio::sync::{mpsc, watch};
use tracing::debug;

use crate::error::{OpenProxyError, Result};
use crate::models::ProxyEndpoint;

/// Cyclic emitter over a shuffled, read-only snapshot
pub(crate) struct Rotation {
    snapshot: Vec<ProxyEndpoint>,
    cursor: usize,
}

impl Rotation {
    /// Shuffle the snapshot (Fisher-Yates) and start at its first element.
    ///
    /// An empty snapshot has nothing to rotate and is reported as
    /// [`OpenProxyError::EmptyResult`].
    pub fn new<R: Rng + ?Sized>(mut snapshot: Vec<ProxyEndpoint>, rng: &mut R) -> Result<Self> {
        if snapshot.is_empty() {
            return Err(OpenProxyError::EmptyResult);
        }
        snapshot.shuffle(rng);
        Ok(Self {
            snapshot,
            cursor: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.snapshot.len()
    }

    /// Element under the cursor; the cursor wraps after the last element
    fn advance(&mut self) -> ProxyEndpoint {
        let endpoint = self.snapshot[self.cursor].clone();
        self.cursor = (self.cursor + 1) % self.snapshot.len();
        endpoint
    }

    /// Feed the output channel until the consumer closes or drops the stream.
    ///
    /// Each send waits for channel capacity, so the consumer sets the pace.
    pub async fn run(
        mut self,
        output: &mpsc::Sender<Result<ProxyEndpoint>>,
        shutdown: &mut watch::Receiver<bool>,
    ) {
        let mut emitted: u64 = 0;

        loop {
            let endpoint = self.advance();

            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                sent = output.send(Ok(endpoint)) => {
                    if sent.is_err() {
                        break;
                    }
                    emitted += 1;
                }
            }
        }

        debug!("Rotation stopped after {} proxies", emitted);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn snapshot(n: usize) -> Vec<ProxyEndpoint> {
        (1..=n)
            .map(|i| ProxyEndpoint::parse(&format!("http://10.0.0.{}:8080", i)).unwrap())
            .collect()
    }

    #[test]
    fn test_rotation_empty() {
        let mut rng = StdRng::seed_from_u64(7);
        let result = Rotation::new(Vec::new(), &mut rng);
        assert!(matches!(result, Err(OpenProxyError::EmptyResult)));
    }

    #[test]
    fn test_rotation_is_periodic_permutation() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut rotation = Rotation::new(snapshot(5), &mut rng).unwrap();
        assert_eq!(rotation.len(), 5);

        let first: Vec<_> = (0..5).map(|_| rotation.advance()).collect();
        let second: Vec<_> = (0..5).map(|_| rotation.advance()).collect();
        assert_eq!(first, second);

        let mut sorted = first.clone();
        sorted.sort_by_key(|e| e.to_string());
        assert_eq!(sorted, snapshot(5));
    }

    #[test]
    fn test_rotation_same_seed_same_order() {
        let order = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut rotation = Rotation::new(snapshot(20), &mut rng).unwrap();
            (0..20).map(|_| rotation.advance()).collect::<Vec<_>>()
        };
        assert_eq!(order(99), order(99));
    }

    #[test]
    fn test_rotation_single_element() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut rotation = Rotation::new(snapshot(1), &mut rng).unwrap();
        for _ in 0..3 {
            assert_eq!(rotation.advance().to_string(), "http://10.0.0.1:8080");
        }
    }

    #[tokio::test]
    async fn test_rotation_stops_on_shutdown() {
        let mut rng = StdRng::seed_from_u64(3);
        let rotation = Rotation::new(snapshot(3), &mut rng).unwrap();
        let (tx, mut rx) = mpsc::channel(1);
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            rotation.run(&tx, &mut shutdown_rx).await;
        });

        assert!(rx.recv().await.unwrap().is_ok());
        shutdown_tx.send(true).unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_rotation_stops_when_consumer_drops() {
        let mut rng = StdRng::seed_from_u64(3);
        let rotation = Rotation::new(snapshot(3), &mut rng).unwrap();
        let (tx, rx) = mpsc::channel(1);
        let (_shutdown_tx, mut shutdown_rx) = watch::channel(false);

        drop(rx);
        rotation.run(&tx, &mut shutdown_rx).await;
    }
}
