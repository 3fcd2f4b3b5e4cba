//! Batch-queue plumbing: the job-description format and the command-line
//! tools that submit and inspect jobs.

pub mod queue;
pub mod script;

pub use queue::{ListingSnapshot, QueueCli, QueueListing, SubmitReceipt};
pub use script::JobScript;
