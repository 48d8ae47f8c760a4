use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

/// Custom epoch: 2025-01-01T00:00:00Z in milliseconds since Unix epoch.
const DATAFLOW_EPOCH_MS: u64 = 1_735_689_600_000;

const WORKER_BITS: u64 = 10;
const SEQUENCE_BITS: u64 = 12;
const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1; // 4095

struct State {
    last_ms: u64,
    sequence: u64,
}

/// 64-bit snowflake ID generator used for audit records.
///
/// Layout (MSB → LSB):
/// - Bits 63–22: Timestamp (42 bits): ms since the dataflow epoch
/// - Bits 21–12: Worker ID (10 bits)
/// - Bits 11–0:  Sequence (12 bits): per-ms counter, max 4096/ms
///
/// If the wall clock steps backwards the generator keeps issuing IDs from the
/// last observed millisecond, moving to the next millisecond without waiting
/// when its sequence runs out. IDs stay strictly increasing.
pub struct SnowflakeGenerator {
    worker_id: u64,
    state: Mutex<State>,
}

impl SnowflakeGenerator {
    pub fn new(worker_id: u16) -> Self {
        assert!(
            (worker_id as u64) < (1 << WORKER_BITS),
            "worker_id must fit in {WORKER_BITS} bits"
        );
        Self {
            worker_id: worker_id as u64,
            state: Mutex::new(State {
                last_ms: 0,
                sequence: 0,
            }),
        }
    }

    pub fn generate(&self) -> i64 {
        self.generate_with(current_ms)
    }

    fn generate_with(&self, clock: impl Fn() -> u64) -> i64 {
        let mut state = self.state.lock();

        let wall_ms = clock();
        if wall_ms > state.last_ms {
            state.last_ms = wall_ms;
            state.sequence = 0;
        } else {
            state.sequence = (state.sequence + 1) & SEQUENCE_MASK;
            if state.sequence == 0 {
                // Sequence exhausted for this millisecond. A clock that is
                // behind never catches up in time, so only wait when the
                // wall clock is on `last_ms` itself.
                if wall_ms == state.last_ms {
                    while clock() <= state.last_ms {
                        std::hint::spin_loop();
                    }
                }
                state.last_ms += 1;
            }
        }

        let ts = state.last_ms.saturating_sub(DATAFLOW_EPOCH_MS);
        let id = (ts << (WORKER_BITS + SEQUENCE_BITS))
            | (self.worker_id << SEQUENCE_BITS)
            | state.sequence;

        id as i64
    }
}

fn current_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(DATAFLOW_EPOCH_MS)
}

/// Extract the creation timestamp (ms since Unix epoch) from a snowflake ID.
pub fn snowflake_timestamp_ms(id: i64) -> u64 {
    let ts = (id as u64) >> (WORKER_BITS + SEQUENCE_BITS);
    ts + DATAFLOW_EPOCH_MS
}
