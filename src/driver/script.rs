//! A line-oriented trace driver over the heap
//!
//! The real client of the heap is a guest-language interpreter, which
//! lives outside this repo. The driver stands in for it: a script is
//! a sequence of heap operations, one per line, covering exactly the
//! surface the interpreter consumes. Each operation prints one trace
//! line. Bindings hold heap addresses, and every use re-materializes
//! the value through `fetch_mono` and `dispatch`, the same way an
//! interpreter would.
//!
//! ```text
//! # comments and blank lines are skipped
//! int n -1025            # allocate an INT32, bind it to `n`
//! float f 0.9
//! array xs               # allocate an empty array
//! append xs n            # construction-time append
//! index xs 0             # print the element value
//! length xs
//! clone ys xs
//! slice zs xs 0 1        # inclusive bounds
//! concat ws xs ys
//! push ws2 ws n
//! pop rest xs            # bind the shortened array, print the element
//! shift rest2 xs
//! remove rest3 xs 1
//! gc                     # run a minor collection
//! stats                  # print statistics so far
//! dump                   # dump the working set's region layouts
//! ```

use std::fs;
use std::str::FromStr;
use std::time::Instant;

use indexmap::IndexMap;
use log::debug;

use crate::driver::error::DriverError;
use crate::driver::options::RunArgs;
use crate::driver::statistics::Statistics;
use crate::memory::alloc::Allocator;
use crate::memory::collect::collect_minor;
use crate::memory::heap::Heap;
use crate::memory::wrapper::array::ArrayView;
use crate::memory::wrapper::MonoView;
use crate::memory::Address;

/// Execute a script file against a fresh heap
pub fn run_file(args: &RunArgs) -> Result<(), DriverError> {
    let text = fs::read_to_string(&args.file)?;
    let heap = Heap::new();
    let mut runner = ScriptRunner::new(&heap);

    let started = Instant::now();
    let outcome = runner.run(&text);
    runner
        .statistics_mut()
        .timings_mut()
        .record("execute", started.elapsed());

    if args.dump_regions {
        runner.dump();
    }
    if args.statistics {
        eprintln!("{}", runner.finish());
        return outcome;
    }
    outcome
}

/// Executes script lines against one heap, tracking named bindings
pub struct ScriptRunner<'heap> {
    heap: &'heap Heap,
    env: IndexMap<String, Address>,
    statistics: Statistics,
}

impl<'heap> ScriptRunner<'heap> {
    pub fn new(heap: &'heap Heap) -> Self {
        ScriptRunner {
            heap,
            env: IndexMap::new(),
            statistics: Statistics::default(),
        }
    }

    fn allocator(&self) -> Allocator<'heap> {
        self.heap.allocator()
    }

    pub fn statistics_mut(&mut self) -> &mut Statistics {
        &mut self.statistics
    }

    /// Capture final heap occupancy and hand back the statistics
    pub fn finish(&mut self) -> Statistics {
        let mut statistics = std::mem::take(&mut self.statistics);
        statistics.capture_heap(&self.heap.stats());
        statistics
    }

    /// Execute every line of a script
    pub fn run(&mut self, text: &str) -> Result<(), DriverError> {
        for (number, line) in text.lines().enumerate() {
            let line = line.trim();
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            self.exec(number + 1, line)?;
        }
        Ok(())
    }

    fn exec(&mut self, line_number: usize, line: &str) -> Result<(), DriverError> {
        debug!("line {}: {}", line_number, line);
        let words: Vec<&str> = line.split_whitespace().collect();
        match words.as_slice() {
            ["int", name, value] => {
                let value: i32 = parse(line_number, value)?;
                let view = self.allocator().int32(value)?;
                self.bind(name, view.mono().address());
                self.statistics.record_allocation();
                println!("int {} = {} @{:#x}", name, value, view.mono().address());
            }
            ["float", name, value] => {
                let value: f64 = parse(line_number, value)?;
                let view = self.allocator().float64(value)?;
                self.bind(name, view.mono().address());
                self.statistics.record_allocation();
                println!("float {} = {} @{:#x}", name, value, view.mono().address());
            }
            ["array", name] => {
                let view = self.allocator().array()?;
                self.bind(name, view.mono().address());
                self.statistics.record_allocation();
                println!("array {} @{:#x}", name, view.mono().address());
            }
            ["chunk", name] => {
                let view = self.allocator().chunk()?;
                self.bind(name, view.mono().address());
                self.statistics.record_allocation();
                println!("chunk {} @{:#x}", name, view.mono().address());
            }
            ["append", array, element] => {
                let array_view = self.fetch_array(line_number, array)?;
                let mono = self.heap.fetch_mono(self.lookup(line_number, element)?)?;
                array_view.append(&mono)?;
                println!(
                    "append {} {} (length {})",
                    array,
                    element,
                    array_view.length()?
                );
            }
            ["index", array, index] => {
                let array_view = self.fetch_array(line_number, array)?;
                let index: u32 = parse(line_number, index)?;
                let view = array_view.index(index)?.dispatch()?;
                println!("{}[{}] = {}", array, index, describe(&view)?);
            }
            ["length", array] => {
                let array_view = self.fetch_array(line_number, array)?;
                println!("length {} = {}", array, array_view.length()?);
            }
            ["clone", target, source] => {
                let out = self.fetch_array(line_number, source)?.clone()?;
                self.bind(target, out.mono().address());
                self.statistics.record_allocation();
                println!("clone {} = {} @{:#x}", target, source, out.mono().address());
            }
            ["slice", target, source, from, to] => {
                let from: u32 = parse(line_number, from)?;
                let to: u32 = parse(line_number, to)?;
                let out = self.fetch_array(line_number, source)?.slice(from, to)?;
                self.bind(target, out.mono().address());
                self.statistics.record_allocation();
                println!(
                    "slice {} = {}[{}..={}] (length {})",
                    target,
                    source,
                    from,
                    to,
                    out.length()?
                );
            }
            ["concat", target, left, right] => {
                let left_view = self.fetch_array(line_number, left)?;
                let right_view = self.fetch_array(line_number, right)?;
                let out = left_view.concat(&right_view)?;
                self.bind(target, out.mono().address());
                self.statistics.record_allocation();
                println!(
                    "concat {} = {} + {} (length {})",
                    target,
                    left,
                    right,
                    out.length()?
                );
            }
            ["push", target, source, element] => {
                let mono = self.heap.fetch_mono(self.lookup(line_number, element)?)?;
                let out = self.fetch_array(line_number, source)?.push(&mono)?;
                self.bind(target, out.mono().address());
                self.statistics.record_allocation();
                println!("push {} (length {})", target, out.length()?);
            }
            ["pop", target, source] => {
                let (rest, removed) = self.fetch_array(line_number, source)?.pop()?;
                self.bind(target, rest.mono().address());
                self.statistics.record_allocation();
                println!("pop {} = {}", target, describe(&removed.dispatch()?)?);
            }
            ["shift", target, source] => {
                let (rest, removed) = self.fetch_array(line_number, source)?.shift()?;
                self.bind(target, rest.mono().address());
                self.statistics.record_allocation();
                println!("shift {} = {}", target, describe(&removed.dispatch()?)?);
            }
            ["remove", target, source, index] => {
                let index: u32 = parse(line_number, index)?;
                let (rest, removed) = self.fetch_array(line_number, source)?.remove(index)?;
                self.bind(target, rest.mono().address());
                self.statistics.record_allocation();
                println!(
                    "remove {}[{}] = {}",
                    source,
                    index,
                    describe(&removed.dispatch()?)?
                );
            }
            ["gc"] => {
                let stats = collect_minor(self.heap)?;
                self.statistics.merge_collection(&stats);
                println!(
                    "gc: {} pairs, {} bytes copied, {} pointers rewritten",
                    stats.pairs_compacted, stats.bytes_copied, stats.pointers_rewritten
                );
            }
            ["stats"] => {
                let mut statistics = std::mem::take(&mut self.statistics);
                statistics.capture_heap(&self.heap.stats());
                println!("{}", statistics);
                self.statistics = statistics;
            }
            ["dump"] => self.dump(),
            _ => {
                return Err(DriverError::Script(
                    line_number,
                    format!("unknown operation '{}'", line),
                ))
            }
        }
        Ok(())
    }

    /// Dump the layout of every region in the working set
    pub fn dump(&self) {
        for base in self.heap.nursery() {
            match self.heap.fetch_region(base) {
                Ok(region) => print!("{:?}", region),
                Err(e) => println!("region @{:#x}: {}", base, e),
            }
        }
    }

    fn bind(&mut self, name: &str, address: Address) {
        self.env.insert(name.to_string(), address);
    }

    fn lookup(&self, line_number: usize, name: &str) -> Result<Address, DriverError> {
        self.env
            .get(name)
            .copied()
            .ok_or_else(|| DriverError::Script(line_number, format!("unbound name '{}'", name)))
    }

    fn fetch_array(
        &self,
        line_number: usize,
        name: &str,
    ) -> Result<ArrayView<'heap>, DriverError> {
        let address = self.lookup(line_number, name)?;
        match self.heap.fetch_mono(address)?.dispatch()? {
            MonoView::Array(array) => Ok(array),
            other => Err(DriverError::Script(
                line_number,
                format!("'{}' is a {:?}, not an array", name, other.kind()),
            )),
        }
    }
}

fn parse<T: FromStr>(line_number: usize, word: &str) -> Result<T, DriverError> {
    word.parse()
        .map_err(|_| DriverError::Script(line_number, format!("bad value '{}'", word)))
}

/// Render a dispatched value for trace output
fn describe(view: &MonoView<'_>) -> Result<String, DriverError> {
    Ok(match view {
        MonoView::Int32(v) => v.read()?.to_string(),
        MonoView::Float64(v) => v.read()?.to_string(),
        MonoView::Array(v) => format!("array(length {})", v.length()?),
        MonoView::Chunk(v) => format!("chunk(length {})", v.length()?),
        MonoView::Address(v) => format!("@{:#x}", v.read()?),
        other => format!("{:?}", other.kind()),
    })
}

#[cfg(test)]
pub mod tests {

    use super::*;

    #[test]
    pub fn test_scalar_and_array_ops() {
        let heap = Heap::new();
        let mut runner = ScriptRunner::new(&heap);
        runner
            .run(
                "# build a two-element array\n\
                 int n -1025\n\
                 float f 0.9\n\
                 array xs\n\
                 append xs n\n\
                 append xs f\n\
                 length xs\n\
                 slice ys xs 0 0\n\
                 pop rest xs\n",
            )
            .unwrap();

        let xs = runner.fetch_array(0, "xs").unwrap();
        assert_eq!(xs.length().unwrap(), 2);
        let ys = runner.fetch_array(0, "ys").unwrap();
        assert_eq!(ys.length().unwrap(), 1);
        let rest = runner.fetch_array(0, "rest").unwrap();
        assert_eq!(rest.length().unwrap(), 1);
    }

    #[test]
    pub fn test_gc_line_runs_a_collection() {
        let heap = Heap::new();
        let mut runner = ScriptRunner::new(&heap);
        runner.run("int n 1\ngc\n").unwrap();
        assert_eq!(heap.stats().collections, 1);
    }

    #[test]
    pub fn test_unknown_operation_reports_its_line() {
        let heap = Heap::new();
        let mut runner = ScriptRunner::new(&heap);
        let err = runner.run("int n 1\nfrobnicate n\n").unwrap_err();
        match err {
            DriverError::Script(line, message) => {
                assert_eq!(line, 2);
                assert!(message.contains("frobnicate"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    pub fn test_bad_value_is_a_script_error() {
        let heap = Heap::new();
        let mut runner = ScriptRunner::new(&heap);
        assert!(matches!(
            runner.run("int n nope\n"),
            Err(DriverError::Script(1, _))
        ));
    }

    #[test]
    pub fn test_unbound_name() {
        let heap = Heap::new();
        let mut runner = ScriptRunner::new(&heap);
        assert!(matches!(
            runner.run("array xs\nappend xs ghost\n"),
            Err(DriverError::Script(2, _))
        ));
    }

    #[test]
    pub fn test_heap_errors_propagate() {
        let heap = Heap::new();
        let mut runner = ScriptRunner::new(&heap);
        let err = runner.run("array xs\nindex xs 0\n").unwrap_err();
        assert!(matches!(
            err,
            DriverError::Heap(crate::memory::error::HeapError::OutOfRange { .. })
        ));
    }
}
