#![deny(warnings)]
#![deny(clippy::all)]

use std::env;
use std::io::{Cursor, Read};

use boundcopy_core::{transfer_all, transfer_n, Source, TransferError};
use boundcopy_testkit::{sample_bytes, CapableSource, FailingSink, PlainSource};

const DEFAULT_ITERS: u64 = 2000;
const DEFAULT_MAX_LEN: usize = 4096;
const DEFAULT_SEED: u64 = 0xA5A5_5A5A_1234_5678;
const MAX_DEPTH: u64 = 4;

fn main() {
    let args: Vec<String> = env::args().collect();
    let iters = parse_arg(&args, "--iters")
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(DEFAULT_ITERS);
    let max_len = parse_arg(&args, "--max-len")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(DEFAULT_MAX_LEN);
    let seed = env::var("BOUNDCOPY_FUZZ_SEED")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(DEFAULT_SEED);

    let mut rng = XorShift64::new(seed);
    let mut stats = FuzzStats::default();

    for iter in 0..iters {
        let case = random_case(&mut rng, max_len);
        if let Err(msg) = run_case(&mut stats, &case) {
            eprintln!("fuzz-lite mismatch at iteration {iter} (seed {seed}): {msg}");
            eprintln!("case: {case:?}");
            std::process::exit(1);
        }
    }

    println!(
        "fuzz-lite completed: {} iterations (complete: {}, short: {}, sink failures: {}, fast path: {})",
        iters, stats.complete, stats.short, stats.sink_failures, stats.fast_path
    );
}

fn parse_arg<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.iter()
        .position(|arg| arg == name)
        .and_then(|idx| args.get(idx + 1))
        .map(|s| s.as_str())
}

#[derive(Default)]
struct FuzzStats {
    complete: u64,
    short: u64,
    sink_failures: u64,
    fast_path: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKind {
    Capable,
    Plain,
    Trickle,
    Cursor,
    Slice,
}

impl SourceKind {
    /// Whether the fast path of this source consumes only what the sink
    /// accepted.
    fn has_fast_path(self) -> bool {
        !matches!(self, SourceKind::Plain | SourceKind::Trickle)
    }
}

#[derive(Debug)]
struct FuzzCase {
    kind: SourceKind,
    data_len: usize,
    chunk: usize,
    /// Innermost first.
    budgets: Vec<u64>,
    request: Option<u64>,
    sink_capacity: usize,
}

struct Outcome {
    result: Result<u64, TransferError>,
    budgets_left: Vec<u64>,
    consumed: usize,
    fast_path_calls: Option<usize>,
    written: Vec<u8>,
}

fn random_case(rng: &mut XorShift64, max_len: usize) -> FuzzCase {
    let max_len = max_len.max(1);
    let data_len = rng.below(max_len as u64 + 1) as usize;
    let kind = match rng.below(5) {
        0 => SourceKind::Capable,
        1 => SourceKind::Plain,
        2 => SourceKind::Trickle,
        3 => SourceKind::Cursor,
        _ => SourceKind::Slice,
    };

    let span = data_len as u64 * 2 + 2;
    let depth = rng.below(MAX_DEPTH + 1);
    let budgets = (0..depth).map(|_| rng.below(span)).collect();
    let request = if rng.below(2) == 0 {
        None
    } else {
        Some(rng.below(span))
    };
    let sink_capacity = if rng.below(4) == 0 {
        rng.below(data_len as u64 + 1) as usize
    } else {
        usize::MAX
    };

    FuzzCase {
        kind,
        data_len,
        chunk: 1 + rng.below(64) as usize,
        budgets,
        request,
        sink_capacity,
    }
}

fn run_case(stats: &mut FuzzStats, case: &FuzzCase) -> Result<(), String> {
    let outcome = execute(case);

    let bound = case
        .budgets
        .iter()
        .copied()
        .fold(case.data_len as u64, u64::min);
    let available = case.request.map_or(bound, |request| bound.min(request));
    let sink_limited = (case.sink_capacity as u64) < available;
    let expected = if sink_limited {
        case.sink_capacity as u64
    } else {
        available
    };

    match (&outcome.result, case.request) {
        (Err(err), _) if sink_limited => {
            if err.is_short() || err.transferred() != expected {
                return Err(format!("expected sink failure after {expected} bytes, got {err}"));
            }
            stats.sink_failures += 1;
        }
        (Ok(n), None) if !sink_limited => {
            if *n != expected {
                return Err(format!("expected {expected} bytes, got {n}"));
            }
            stats.complete += 1;
        }
        (Ok(n), Some(request)) if !sink_limited && expected == request => {
            if *n != request {
                return Err(format!("expected {request} bytes, got {n}"));
            }
            stats.complete += 1;
        }
        (Err(err), Some(request)) if !sink_limited && expected < request => {
            if !err.is_short() || err.transferred() != expected {
                return Err(format!("expected short transfer of {expected} bytes, got {err}"));
            }
            stats.short += 1;
        }
        (result, _) => return Err(format!("unexpected result {result:?}")),
    }

    if outcome.written[..] != sample_bytes(case.data_len)[..expected as usize] {
        return Err("sink content does not match the source prefix".to_string());
    }

    let wrapped = !case.budgets.is_empty() || case.request.is_some();
    if !sink_limited || (wrapped && case.kind.has_fast_path()) {
        if outcome.consumed as u64 != expected {
            return Err(format!(
                "source consumed {} bytes, expected {expected}",
                outcome.consumed
            ));
        }
        for (level, (&budget, &left)) in case.budgets.iter().zip(&outcome.budgets_left).enumerate()
        {
            if left != budget - expected {
                return Err(format!(
                    "wrapper {level} left with {left}, expected {}",
                    budget - expected
                ));
            }
        }
    }

    if let Some(calls) = outcome.fast_path_calls {
        if wrapped && calls == 0 {
            return Err("bounded copy did not reach the fast path".to_string());
        }
        if calls > 0 {
            stats.fast_path += 1;
        }
    }

    Ok(())
}

fn execute(case: &FuzzCase) -> Outcome {
    let mut sink = FailingSink::new(case.sink_capacity);
    let data = sample_bytes(case.data_len);

    let (result, budgets_left, consumed, fast_path_calls) = match case.kind {
        SourceKind::Capable => {
            let mut source = CapableSource::new(data).with_chunk(case.chunk);
            let (result, left) = run_nested(&mut source, case, &mut sink);
            (result, left, source.consumed(), Some(source.calls()))
        }
        SourceKind::Plain => {
            let mut source = PlainSource::new(data);
            let (result, left) = run_nested(&mut source, case, &mut sink);
            (result, left, source.consumed(), None)
        }
        SourceKind::Trickle => {
            let mut source = PlainSource::new(data).trickle(case.chunk);
            let (result, left) = run_nested(&mut source, case, &mut sink);
            (result, left, source.consumed(), None)
        }
        SourceKind::Cursor => {
            let mut source = Cursor::new(data);
            let (result, left) = run_nested(&mut source, case, &mut sink);
            (result, left, source.position() as usize, None)
        }
        SourceKind::Slice => {
            let mut source = &data[..];
            let (result, left) = run_nested(&mut source, case, &mut sink);
            (result, left, data.len() - source.len(), None)
        }
    };

    Outcome {
        result,
        budgets_left,
        consumed,
        fast_path_calls,
        written: sink.accepted().to_vec(),
    }
}

fn run_nested(
    source: &mut dyn Source,
    case: &FuzzCase,
    sink: &mut FailingSink,
) -> (Result<u64, TransferError>, Vec<u64>) {
    wrap_and_transfer(source, &case.budgets, case.request, sink)
}

/// Wraps `source` once per budget (innermost first) and returns each
/// wrapper's remaining budget in the same order.
fn wrap_and_transfer(
    source: &mut dyn Source,
    budgets: &[u64],
    request: Option<u64>,
    sink: &mut FailingSink,
) -> (Result<u64, TransferError>, Vec<u64>) {
    match budgets.split_first() {
        None => {
            let result = match request {
                Some(len) => transfer_n(sink, source, len),
                None => transfer_all(sink, source),
            };
            (result, Vec::new())
        }
        Some((&budget, outer)) => {
            let mut limited = source.take(budget);
            let (result, mut left) = wrap_and_transfer(&mut limited, outer, request, sink);
            left.insert(0, limited.limit());
            (result, left)
        }
    }
}

struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    fn new(seed: u64) -> Self {
        Self { state: seed.max(1) }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    fn below(&mut self, bound: u64) -> u64 {
        if bound == 0 {
            0
        } else {
            self.next_u64() % bound
        }
    }
}
