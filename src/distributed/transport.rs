//! Update messages and the transport workers exchange them over

use crate::error::{Result, SubgraphError};
use bytes::Bytes;
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

/// One `(global vertex id, color-set index, count)` triple
pub type Update = (u32, u32, f64);

/// A chunk of the rows one worker ships to another during one exchange step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateBatch {
    pub step: u64,
    pub chunk: u32,
    /// Set on the final chunk of this step for this destination
    pub last: bool,
    pub updates: Vec<Update>,
}

impl UpdateBatch {
    pub fn encode(&self) -> Result<Bytes> {
        Ok(Bytes::from(bincode::serialize(self)?))
    }

    pub fn decode(payload: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(payload)?)
    }

    /// Split `updates` into batches of at most `limit` triples; an empty input still yields
    /// one (empty, final) batch
    pub fn chunked(step: u64, updates: &[Update], limit: usize) -> Vec<UpdateBatch> {
        if updates.is_empty() {
            return vec![UpdateBatch {
                step,
                chunk: 0,
                last: true,
                updates: Vec::new(),
            }];
        }
        let chunks = updates.chunks(limit.max(1));
        let total = chunks.len();
        chunks
            .enumerate()
            .map(|(i, part)| UpdateBatch {
                step,
                chunk: i as u32,
                last: i + 1 == total,
                updates: part.to_vec(),
            })
            .collect()
    }
}

/// Point-to-point messaging plus a barrier among a fixed set of mappers
pub trait Transport: Send {
    fn mapper_id(&self) -> usize;

    fn mapper_num(&self) -> usize;

    fn send(&self, dest: usize, payload: Bytes) -> Result<()>;

    /// Next message addressed to this mapper, with its sender
    fn recv(&self) -> Result<(usize, Bytes)>;

    /// Block until every mapper has reached the same barrier
    fn barrier(&self) -> Result<()>;

    /// Release peers blocked in `barrier` or `recv`; they return a transport error
    fn abort(&self);
}

struct BarrierState {
    arrived: usize,
    generation: u64,
    broken: bool,
}

/// Reusable barrier whose waits give up after a timeout or once any party aborts
pub struct TimedBarrier {
    parties: usize,
    timeout: Duration,
    state: Mutex<BarrierState>,
    cvar: Condvar,
}

impl TimedBarrier {
    pub fn new(parties: usize, timeout: Duration) -> Self {
        Self {
            parties,
            timeout,
            state: Mutex::new(BarrierState {
                arrived: 0,
                generation: 0,
                broken: false,
            }),
            cvar: Condvar::new(),
        }
    }

    pub fn wait(&self) -> Result<()> {
        let poisoned = |_| SubgraphError::transport("barrier lock poisoned");
        let mut state = self.state.lock().map_err(poisoned)?;
        if state.broken {
            return Err(SubgraphError::transport("barrier broken by a failed peer"));
        }

        let generation = state.generation;
        state.arrived += 1;
        if state.arrived == self.parties {
            state.arrived = 0;
            state.generation += 1;
            self.cvar.notify_all();
            return Ok(());
        }

        let deadline = Instant::now() + self.timeout;
        while state.generation == generation && !state.broken {
            let now = Instant::now();
            if now >= deadline {
                state.broken = true;
                self.cvar.notify_all();
                return Err(SubgraphError::transport(format!(
                    "barrier timed out after {:?}",
                    self.timeout
                )));
            }
            state = self
                .cvar
                .wait_timeout(state, deadline - now)
                .map_err(|_| SubgraphError::transport("barrier lock poisoned"))?
                .0;
        }

        if state.generation == generation {
            return Err(SubgraphError::transport("barrier broken by a failed peer"));
        }
        Ok(())
    }

    pub fn abort(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.broken = true;
            self.cvar.notify_all();
        }
    }
}

enum Envelope {
    Data(usize, Bytes),
    Abort(usize),
}

/// In-process transport over crossbeam channels, one endpoint per mapper
pub struct ChannelTransport {
    mapper_id: usize,
    senders: Vec<Sender<Envelope>>,
    receiver: Receiver<Envelope>,
    barrier: Arc<TimedBarrier>,
    timeout: Duration,
}

impl ChannelTransport {
    /// Fully connected endpoints for `mapper_num` mappers
    pub fn mesh(mapper_num: usize, timeout: Duration) -> Vec<ChannelTransport> {
        let (senders, receivers): (Vec<_>, Vec<_>) =
            (0..mapper_num).map(|_| channel::unbounded()).unzip();
        let barrier = Arc::new(TimedBarrier::new(mapper_num, timeout));

        receivers
            .into_iter()
            .enumerate()
            .map(|(mapper_id, receiver)| ChannelTransport {
                mapper_id,
                senders: senders.clone(),
                receiver,
                barrier: Arc::clone(&barrier),
                timeout,
            })
            .collect()
    }
}

impl Transport for ChannelTransport {
    fn mapper_id(&self) -> usize {
        self.mapper_id
    }

    fn mapper_num(&self) -> usize {
        self.senders.len()
    }

    fn send(&self, dest: usize, payload: Bytes) -> Result<()> {
        let sender = self.senders.get(dest).ok_or_else(|| {
            SubgraphError::transport(format!("no mapper {} among {}", dest, self.senders.len()))
        })?;
        sender
            .send(Envelope::Data(self.mapper_id, payload))
            .map_err(|_| SubgraphError::transport(format!("mapper {} is unreachable", dest)))
    }

    fn recv(&self) -> Result<(usize, Bytes)> {
        let envelope = self
            .receiver
            .recv_timeout(self.timeout)
            .map_err(|e| match e {
                RecvTimeoutError::Timeout => SubgraphError::transport(format!(
                    "mapper {} received nothing for {:?}",
                    self.mapper_id, self.timeout
                )),
                RecvTimeoutError::Disconnected => {
                    SubgraphError::transport("all peers disconnected")
                }
            })?;

        match envelope {
            Envelope::Data(src, payload) => Ok((src, payload)),
            Envelope::Abort(src) => Err(SubgraphError::transport(format!(
                "mapper {} aborted the job",
                src
            ))),
        }
    }

    fn barrier(&self) -> Result<()> {
        self.barrier.wait()
    }

    fn abort(&self) {
        self.barrier.abort();
        for (dest, sender) in self.senders.iter().enumerate() {
            if dest != self.mapper_id {
                // a peer that already finished has dropped its receiver
                let _ = sender.send(Envelope::Abort(self.mapper_id));
            }
        }
    }
}
