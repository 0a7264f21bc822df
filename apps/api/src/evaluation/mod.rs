// Offline quality loop: topic detection, three-axis scoring, and few-shot tuning.
// The live interview never waits on anything in here except the compiled demonstrations.

pub mod dataset;
pub mod handlers;
pub mod prompts;
pub mod scorer;
pub mod skills;
pub mod tuning;
