//! Parameter-set files: comma-separated rate values, one set per line,
//! plus the named ranges the evolutionary search draws sets from.

pub mod formats;
pub mod ranges;
pub mod sets;

pub use formats::{convert_file, convert_set, layout, MASTER_SIZE};
pub use ranges::{read_ranges, refine, write_ranges, ParamRange};
pub use sets::{read_float_sets, read_sets, write_sets};
