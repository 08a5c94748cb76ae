#![allow(dead_code, unused_imports)]

pub use stagerun_test_utils::builders;
pub use stagerun_test_utils::recorder::Recorder;
pub use stagerun_test_utils::{init_tracing, params, with_timeout};
