//! Résumé-job matching: the weighted composite scorer, the oracle seams
//! it calls through, and the self-critique refinement loop.

pub mod oracle;
pub mod prompts;
pub mod refine;
pub mod scorer;
