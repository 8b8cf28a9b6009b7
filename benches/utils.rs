use std::sync::Arc;
use std::thread;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

// --- Data Types and Constants ---

#[derive(Debug, Default)]
pub struct HeavyPayload {
    pub _id: u64,
    pub _payload: Vec<u8>,
}
pub type ArcData = Arc<HeavyPayload>;
pub const NUM_CONSUMERS: usize = 5;

pub fn generate_payloads(count: u64) -> Vec<ArcData> {
    (0..count)
        .map(|i| {
            Arc::new(HeavyPayload {
                _id: i,
                _payload: vec![0; 1024],
            })
        })
        .collect()
}

// --- Channel Fan-Out Implementation ---

// Baseline: one bounded mpsc channel per consumer, fed by a dedicated task.
pub fn run_channel_fan_out(data: Vec<ArcData>) -> Vec<ReceiverStream<ArcData>> {
    let mut txs = Vec::new();
    let mut rx_streams = Vec::new();
    for _ in 0..NUM_CONSUMERS {
        let (tx, rx) = mpsc::channel(1024);
        txs.push(tx);
        rx_streams.push(ReceiverStream::new(rx));
    }

    tokio::spawn(async move {
        for item in data {
            for tx in &txs {
                let _ = tx.send(item.clone()).await;
            }
        }
    });
    rx_streams
}

// --- Thread-per-consumer helpers ---

pub fn spawn_blocking_consumers(
    readers: Vec<stream_fanout::Reader<ArcData>>,
) -> Vec<thread::JoinHandle<usize>> {
    readers
        .into_iter()
        .map(|mut reader| thread::spawn(move || reader.blocking_iter().count()))
        .collect()
}
