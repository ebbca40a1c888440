use std::{collections::BTreeSet, fmt, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Value, errors::MetadataError};

/// Backend family a contract descriptor belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BackendKind {
    Generic,
    Ethereum,
    Quorum,
    Fabric,
}

impl BackendKind {
    /// Name of the descriptor type of this family, e.g. `QuorumContractDescriptor`.
    pub const fn descriptor_type_name(self) -> &'static str {
        match self {
            Self::Generic => "ContractDescriptor",
            Self::Ethereum => "EthereumContractDescriptor",
            Self::Quorum => "QuorumContractDescriptor",
            Self::Fabric => "FabricContractDescriptor",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Generic => "generic",
            Self::Ethereum => "ethereum",
            Self::Quorum => "quorum",
            Self::Fabric => "fabric",
        })
    }
}

/// Backend specific part of a contract descriptor.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum BackendInfo {
    #[default]
    Generic,
    Ethereum(EthereumInfo),
    Quorum(QuorumInfo),
    Fabric(FabricInfo),
}

impl BackendInfo {
    pub const fn kind(&self) -> BackendKind {
        match self {
            Self::Generic => BackendKind::Generic,
            Self::Ethereum(_) => BackendKind::Ethereum,
            Self::Quorum(_) => BackendKind::Quorum,
            Self::Fabric(_) => BackendKind::Fabric,
        }
    }

    /// Ethereum fields of Ethereum and Quorum descriptors.
    pub const fn ethereum(&self) -> Option<&EthereumInfo> {
        match self {
            Self::Ethereum(info) => Some(info),
            Self::Quorum(info) => Some(&info.ethereum),
            _ => None,
        }
    }

    pub fn ethereum_mut(&mut self) -> Option<&mut EthereumInfo> {
        match self {
            Self::Ethereum(info) => Some(info),
            Self::Quorum(info) => Some(&mut info.ethereum),
            _ => None,
        }
    }

    pub const fn fabric(&self) -> Option<&FabricInfo> {
        match self {
            Self::Fabric(info) => Some(info),
            _ => None,
        }
    }

    pub fn fabric_mut(&mut self) -> Option<&mut FabricInfo> {
        match self {
            Self::Fabric(info) => Some(info),
            _ => None,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), MetadataError> {
        match self.ethereum() {
            Some(info) => info.abi_json().map(|_| ()),
            None => Ok(()),
        }
    }
}

/// Deployment data of an EVM contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EthereumInfo {
    /// Address the contract is deployed at, `None` until deployed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,
    /// Contract ABI as compact JSON text
    abi: String,
    /// Hex encoded contract binary, required for deployment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary: Option<String>,
}

impl EthereumInfo {
    /// Creates the info from ABI JSON text, normalizing its whitespace.
    pub fn new(abi: &str) -> Result<Self, MetadataError> {
        let parsed: Value =
            serde_json::from_str(abi).map_err(|e| MetadataError::InvalidAbi(e.to_string()))?;
        let abi =
            serde_json::to_string(&parsed).map_err(|e| MetadataError::InvalidAbi(e.to_string()))?;
        Ok(Self {
            contract_address: None,
            abi,
            binary: None,
        })
    }

    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = Some(binary.into());
        self
    }

    pub fn with_contract_address(mut self, address: impl Into<String>) -> Self {
        self.contract_address = Some(address.into());
        self
    }

    pub fn abi(&self) -> &str {
        &self.abi
    }

    pub fn abi_json(&self) -> Result<Value, MetadataError> {
        serde_json::from_str(&self.abi).map_err(|e| MetadataError::InvalidAbi(e.to_string()))
    }

    pub fn set_contract_address(&mut self, address: impl Into<String>) {
        self.contract_address = Some(address.into());
    }

    pub const fn is_deployed(&self) -> bool {
        self.contract_address.is_some()
    }
}

/// Deployment data of a contract on a permissioned EVM network with private transactions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuorumInfo {
    #[serde(flatten)]
    pub ethereum: EthereumInfo,
    /// Public keys of the nodes a private transaction is shared with, empty for public ones
    #[serde(default)]
    pub private_for: Vec<String>,
}

impl QuorumInfo {
    pub const fn new(ethereum: EthereumInfo) -> Self {
        Self {
            ethereum,
            private_for: Vec::new(),
        }
    }

    pub fn with_private_for(mut self, keys: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.private_for = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_private(&self) -> bool {
        !self.private_for.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaincodeId {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl ChaincodeId {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            path: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

impl fmt::Display for ChaincodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if let Some(version) = &self.version {
            write!(f, ":{version}")?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChaincodeLanguage {
    #[default]
    Go,
    Java,
    Node,
}

/// Deployment data of a chaincode.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FabricInfo {
    pub chaincode_id: ChaincodeId,
    #[serde(default)]
    pub chaincode_language: ChaincodeLanguage,
    /// Serialized endorsement policy
    #[serde(
        default,
        with = "crate::utils::base64_bytes_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub endorsement_policy: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chaincode_source_directory: Option<PathBuf>,
    #[serde(default)]
    pub target_peers: BTreeSet<String>,
    #[serde(default)]
    installed_on: BTreeSet<String>,
    #[serde(default)]
    instantiated_on: BTreeSet<String>,
}

impl FabricInfo {
    pub fn new(chaincode_id: ChaincodeId, chaincode_language: ChaincodeLanguage) -> Self {
        Self {
            chaincode_id,
            chaincode_language,
            endorsement_policy: None,
            chaincode_source_directory: None,
            target_peers: BTreeSet::new(),
            installed_on: BTreeSet::new(),
            instantiated_on: BTreeSet::new(),
        }
    }

    pub fn with_endorsement_policy(mut self, policy: impl Into<Vec<u8>>) -> Self {
        self.endorsement_policy = Some(policy.into());
        self
    }

    pub fn with_source_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.chaincode_source_directory = Some(directory.into());
        self
    }

    pub fn with_target_peers(mut self, peers: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.target_peers = peers.into_iter().map(Into::into).collect();
        self
    }

    pub fn add_installed_on(&mut self, peer: impl Into<String>) {
        self.installed_on.insert(peer.into());
    }

    pub fn set_installed_on(&mut self, peers: impl IntoIterator<Item = impl Into<String>>) {
        self.installed_on = peers.into_iter().map(Into::into).collect();
    }

    pub fn set_instantiated_on(&mut self, peers: impl IntoIterator<Item = impl Into<String>>) {
        self.instantiated_on = peers.into_iter().map(Into::into).collect();
    }

    pub const fn installed_on(&self) -> &BTreeSet<String> {
        &self.installed_on
    }

    pub const fn instantiated_on(&self) -> &BTreeSet<String> {
        &self.instantiated_on
    }

    pub fn is_installed_on(&self, peer: &str) -> bool {
        self.installed_on.contains(peer)
    }

    pub fn is_instantiated(&self) -> bool {
        !self.instantiated_on.is_empty()
    }
}
