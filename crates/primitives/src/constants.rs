//! Account abstraction (ERC-4337)-related constants

/// Entry point smart contract
pub mod entry_point {
    /// Address of the entry point on the local development chain
    pub const ADDRESS: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";
    /// Bytes of [ADDRESS]
    pub const ADDRESS_BYTES: [u8; 20] = [
        0x5f, 0xbd, 0xb2, 0x31, 0x56, 0x78, 0xaf, 0xec, 0xb3, 0x67, 0xf0, 0x32, 0xd9, 0x3f, 0x64,
        0x2f, 0x64, 0x18, 0x0a, 0xa3,
    ];
    /// Version of the entry point the engine follows
    pub const VERSION: &str = "0.7.0";
    /// Maximum depth of nested message calls
    pub const MAX_CALL_DEPTH: usize = 64;
}

/// Local development chain
pub mod dev {
    /// Chain id of the local development chain
    pub const CHAIN_ID: u64 = 31337;
    /// Well-known development mnemonic
    pub const MNEMONIC: &str = "test test test test test test test test test test test junk";
    /// First account derived from the development mnemonic, deployer of the development contracts
    pub const DEPLOYER: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
    /// Account factory deployed by [DEPLOYER] (second contract creation)
    pub const ACCOUNT_FACTORY: &str = "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512";
    /// Paymaster deployed by [DEPLOYER] (third contract creation)
    pub const PAYMASTER: &str = "0x9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0";
}

/// Default gas values for building user operations
pub mod gas {
    pub const VERIFICATION_GAS_LIMIT: u64 = 1_000_000;
    pub const CALL_GAS_LIMIT: u64 = 500_000;
    pub const PRE_VERIFICATION_GAS: u64 = 50_000;
    pub const MAX_PRIORITY_FEE_PER_GAS: u64 = 5_000_000_000;
    pub const MAX_FEE_PER_GAS: u64 = 10_000_000_000;
    pub const PAYMASTER_VERIFICATION_GAS_LIMIT: u64 = 100_000;
    pub const PAYMASTER_POST_OP_GAS_LIMIT: u64 = 100_000;
}

/// Packed user operation layout
pub mod user_operation {
    /// Length of an address prefix (factory in `initCode`, paymaster in `paymasterAndData`)
    pub const ADDRESS_LENGTH: usize = 20;
    /// Offset of the opaque paymaster data inside `paymasterAndData`
    pub const PAYMASTER_DATA_OFFSET: usize = 52;
    /// Number of low bits of the nonce holding the sequence (the rest is the key)
    pub const NONCE_SEQUENCE_BITS: usize = 64;
}
