use borsh::{BorshDeserialize, BorshSerialize};
use std::io::{Error as IoError, ErrorKind, Read, Write};

/// Wire tags of every action kind the network defines. Only `Transfer` is built here,
/// the rest exist so a decoder can name what it refuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ActionTag {
    CreateAccount = 0,
    DeployContract = 1,
    FunctionCall = 2,
    Transfer = 3,
    Stake = 4,
    AddKey = 5,
    DeleteKey = 6,
    DeleteAccount = 7,
}

impl ActionTag {
    pub fn from_u8(tag: u8) -> Option<Self> {
        Some(match tag {
            0 => ActionTag::CreateAccount,
            1 => ActionTag::DeployContract,
            2 => ActionTag::FunctionCall,
            3 => ActionTag::Transfer,
            4 => ActionTag::Stake,
            5 => ActionTag::AddKey,
            6 => ActionTag::DeleteKey,
            7 => ActionTag::DeleteAccount,
            _ => return None,
        })
    }
}

/// Native token transfer, denominated in yoctoNEAR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct TransferAction {
    pub deposit: u128,
}

/// A single instruction inside a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Transfer(TransferAction),
}

impl Action {
    pub fn transfer(deposit: u128) -> Self {
        Action::Transfer(TransferAction { deposit })
    }

    pub fn tag(&self) -> ActionTag {
        match self {
            Action::Transfer(_) => ActionTag::Transfer,
        }
    }

    /// Value moved by this action.
    pub fn deposit(&self) -> u128 {
        match self {
            Action::Transfer(transfer) => transfer.deposit,
        }
    }
}

impl BorshSerialize for Action {
    fn serialize<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(&[self.tag() as u8])?;
        match self {
            Action::Transfer(transfer) => BorshSerialize::serialize(transfer, writer),
        }
    }
}

impl BorshDeserialize for Action {
    fn deserialize_reader<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        let tag = u8::deserialize_reader(reader)?;
        match ActionTag::from_u8(tag) {
            Some(ActionTag::Transfer) => {
                Ok(Action::Transfer(TransferAction::deserialize_reader(reader)?))
            }
            Some(other) => Err(IoError::new(
                ErrorKind::InvalidData,
                format!("unsupported action kind {:?}", other),
            )),
            None => Err(IoError::new(
                ErrorKind::InvalidData,
                format!("unknown action tag {}", tag),
            )),
        }
    }
}
