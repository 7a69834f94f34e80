use crate::constants::STACK_DEPTH;

/// Knobs for building a `Chip8`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// How many nested CALLs are allowed before `StackOverflow`
    pub stack_depth: usize,
    /// Seed for CXNN; `None` seeds from the OS
    pub seed: Option<u64>,
    /// RET restores V0..VF and I from the saved context as well as PC.
    /// When false only PC comes back, which is what most published ROMs expect.
    pub full_context_return: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            stack_depth: STACK_DEPTH,
            seed: None,
            full_context_return: true,
        }
    }
}
