//! A `Wallet` is a wrapper around an ethers signing key used to sign user operations
use crate::UserOperationSigned;
use ethers::{
    prelude::{k256::ecdsa::SigningKey, rand},
    signers::{coins_bip39::English, MnemonicBuilder, Signer},
    types::Address,
    utils::hash_message,
};
use expanded_pathbuf::ExpandedPathBuf;

/// Wrapper around ethers wallet
#[derive(Clone, Debug)]
pub struct Wallet {
    /// Signing key of the wallet
    pub signer: ethers::signers::Wallet<SigningKey>,
}

impl Wallet {
    /// Builds a `Wallet` from a randomly generated key
    pub fn build_random() -> Self {
        let mut rng = rand::thread_rng();
        Self { signer: ethers::signers::Wallet::new(&mut rng) }
    }

    /// Create a new wallet from the given file containing the mnemonic phrase
    ///
    /// # Arguments
    /// * `path` - The path to the file where the mnemonic phrase is stored
    /// * `index` - Index of the account in the derivation path `m/44'/60'/0'/0/{index}`
    ///
    /// # Returns
    /// * `Self` - A new `Wallet` instance
    pub fn from_file(path: ExpandedPathBuf, index: u32) -> eyre::Result<Self> {
        let signer = MnemonicBuilder::<English>::default()
            .phrase(path.to_path_buf())
            .index(index)?
            .build()?;
        Ok(Self { signer })
    }

    /// Create a new wallet from the given mnemonic phrase
    ///
    /// # Arguments
    /// * `phrase` - The mnemonic phrase
    /// * `index` - Index of the account in the derivation path `m/44'/60'/0'/0/{index}`
    ///
    /// # Returns
    /// * `Self` - A new `Wallet` instance
    pub fn from_phrase(phrase: &str, index: u32) -> eyre::Result<Self> {
        let signer = MnemonicBuilder::<English>::default().phrase(phrase).index(index)?.build()?;
        Ok(Self { signer })
    }

    /// Create a new wallet from a hex-encoded private key
    pub fn from_key(key: &str) -> eyre::Result<Self> {
        Ok(Self { signer: key.parse()? })
    }

    /// Address of the signing key
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Signs the user operation
    ///
    /// The hash is signed as an EIP-191 personal message, the form accounts recover it from.
    ///
    /// # Arguments
    /// * `uo` - The [UserOperationSigned](UserOperationSigned) to be signed
    /// * `ep` - The entry point address
    /// * `chain_id` - The chain id
    ///
    /// # Returns
    /// * `UserOperationSigned` - The user operation with the signature set
    pub fn sign_uo(
        &self,
        uo: &UserOperationSigned,
        ep: &Address,
        chain_id: u64,
    ) -> eyre::Result<UserOperationSigned> {
        let h = uo.hash(ep, chain_id)?;
        let sig = self.signer.sign_hash(hash_message(h.0))?;
        Ok(uo.clone().signature(sig.to_vec().into()))
    }
}
