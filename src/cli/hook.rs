//! plan hook command implementations
//!
//! Hooks speak their own JSON contract on stdout, not the command envelope.

use crate::error::{Error, Result};
use crate::hook::{self, HookContext};

/// Options for `plan hook pre-finish`
pub struct PreFinishOptions {
    pub task_id: Option<String>,
    pub repo_root: Option<String>,
}

pub fn run_pre_finish(options: PreFinishOptions) -> Result<()> {
    let ctx = HookContext::from_reader(std::io::stdin().lock())
        .with_fallbacks(options.task_id, options.repo_root);
    let result = hook::pre_finish(&ctx);

    println!("{}", serde_json::to_string(&result)?);
    if result.ok {
        Ok(())
    } else {
        Err(Error::HookRejected(result.message))
    }
}
