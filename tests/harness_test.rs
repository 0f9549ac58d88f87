//! Run the harness scripts through the driver
use std::path::PathBuf;

use loam::driver::options::RunArgs;
use loam::driver::script;

/// Common options for all tests
pub fn opts(filename: &str) -> RunArgs {
    RunArgs {
        file: PathBuf::from(format!("harness/{filename}")),
        statistics: false,
        dump_regions: false,
    }
}

/// Execute the script and assert a clean exit
fn run_test(args: &RunArgs) {
    script::run_file(args).unwrap();
}

#[test]
pub fn test_harness_001() {
    run_test(&opts("001_scalars.loam"));
}

#[test]
pub fn test_harness_002() {
    run_test(&opts("002_arrays.loam"));
}

#[test]
pub fn test_harness_003() {
    run_test(&opts("003_chunk_spill.loam"));
}

#[test]
pub fn test_harness_004() {
    run_test(&opts("004_immutable_ops.loam"));
}

#[test]
pub fn test_harness_005() {
    run_test(&opts("005_gc.loam"));
}
