#![no_main]

use libfuzzer_sys::fuzz_target;
use wavl_map::model::CursorEquivalenceInput;

fuzz_target!(|input: CursorEquivalenceInput| {
    wavl_map::model::run_cursor_equivalence(input.keys, input.ops);
});
