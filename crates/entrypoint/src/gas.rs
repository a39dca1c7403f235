use ethers::types::U256;
use vela_contracts::Revert;

/// Gas budget of one phase of a user operation (verification, execution or post-operation)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GasMeter {
    limit: U256,
    used: U256,
}

impl GasMeter {
    pub fn new(limit: U256) -> Self {
        Self { limit, used: U256::zero() }
    }

    /// Charges `gas`; running out consumes the whole budget
    pub fn charge(&mut self, gas: u64) -> Result<(), Revert> {
        let used = self.used.saturating_add(gas.into());
        if used > self.limit {
            self.used = self.limit;
            return Err(Revert::OutOfGas);
        }
        self.used = used;
        Ok(())
    }

    pub fn used(&self) -> U256 {
        self.used
    }
}
