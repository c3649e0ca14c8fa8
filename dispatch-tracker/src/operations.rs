//! Unsigned call descriptors for the asset and liquidity operations.
//!
//! Every builder validates its parameters before anything touches the network: accounts must
//! be SS58 addresses and amounts must be positive integers.

use std::fmt;
use std::str::FromStr;

use subxt::ext::scale_value::{Composite, Value};
use subxt::tx::DynamicPayload;
use subxt::utils::AccountId32;

use crate::error::{Error, Result};

/// Pallet hosting the token and pool calls.
const LIQUIDITY_PALLET: &str = "LiquidityPallet";

/// Pallet hosting asset class creation.
const ASSETS_PALLET: &str = "Assets";

/// A single argument of a call, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallArg {
    /// Any integer parameter (asset ids, balances).
    Integer(u128),
    /// A raw `AccountId32` parameter.
    Account(AccountId32),
    /// A lookup source parameter (`MultiAddress::Id`).
    Address(AccountId32),
}

impl CallArg {
    /// Converts the argument into a dynamic value, encoded against the call's metadata on
    /// submission.
    fn to_value(&self) -> Value {
        match self {
            CallArg::Integer(value) => Value::u128(*value),
            CallArg::Account(account) => Value::from_bytes(account.0),
            CallArg::Address(account) => {
                Value::unnamed_variant("Id", [Value::from_bytes(account.0)])
            }
        }
    }
}

/// An unsigned, immutable description of one state-changing call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationDescriptor {
    pallet: String,
    call: String,
    args: Vec<CallArg>,
}

impl OperationDescriptor {
    /// Creates a descriptor for `pallet.call(args..)`.
    pub fn new(pallet: impl Into<String>, call: impl Into<String>, args: Vec<CallArg>) -> Self {
        Self {
            pallet: pallet.into(),
            call: call.into(),
            args,
        }
    }

    /// Pallet (module) name.
    pub fn pallet(&self) -> &str {
        &self.pallet
    }

    /// Call (method) name.
    pub fn call(&self) -> &str {
        &self.call
    }

    /// Ordered call arguments.
    pub fn args(&self) -> &[CallArg] {
        &self.args
    }

    /// Builds the dynamic transaction payload for this call.
    pub fn payload(&self) -> DynamicPayload {
        subxt::dynamic::tx(
            self.pallet.as_str(),
            self.call.as_str(),
            Composite::unnamed(self.args.iter().map(CallArg::to_value)),
        )
    }
}

impl fmt::Display for OperationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.pallet, self.call)
    }
}

/// The business operations a user can submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Move tokens of an asset to another account.
    TransferAsset,
    /// Mint new tokens of an asset.
    MintAsset,
    /// Create a new asset class.
    CreateAsset,
    /// Add liquidity to an asset pair pool.
    DepositLiquidity,
    /// Remove liquidity from an asset pair pool.
    WithdrawLiquidity,
}

impl Operation {
    /// Name shown to users in status messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            Operation::TransferAsset => "Transfer Asset",
            Operation::MintAsset => "Mint Asset",
            Operation::CreateAsset => "Create Asset",
            Operation::DepositLiquidity => "Deposit Liquidity",
            Operation::WithdrawLiquidity => "Withdraw Liquidity",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Parses a positive integer amount.
pub fn parse_amount(field: &'static str, value: &str) -> Result<u128> {
    match value.trim().parse::<u128>() {
        Ok(amount) if amount > 0 => Ok(amount),
        _ => Err(Error::InvalidAmount {
            field,
            value: value.to_string(),
        }),
    }
}

/// Parses an SS58 account address.
pub fn parse_account(address: &str) -> Result<AccountId32> {
    AccountId32::from_str(address.trim()).map_err(|err| Error::InvalidAccount {
        address: address.to_string(),
        message: err.to_string(),
    })
}

/// `LiquidityPallet.transfer_tokens(asset_id, recipient, amount)`
pub fn transfer_asset(asset_id: u32, recipient: &str, amount: &str) -> Result<OperationDescriptor> {
    let recipient = parse_account(recipient)?;
    let amount = parse_amount("amount", amount)?;

    Ok(OperationDescriptor::new(
        LIQUIDITY_PALLET,
        "transfer_tokens",
        vec![
            CallArg::Integer(asset_id.into()),
            CallArg::Account(recipient),
            CallArg::Integer(amount),
        ],
    ))
}

/// `LiquidityPallet.mint_tokens(asset_id, amount, beneficiary)`
pub fn mint_asset(asset_id: u32, beneficiary: &str, amount: &str) -> Result<OperationDescriptor> {
    let beneficiary = parse_account(beneficiary)?;
    let amount = parse_amount("amount", amount)?;

    Ok(OperationDescriptor::new(
        LIQUIDITY_PALLET,
        "mint_tokens",
        vec![
            CallArg::Integer(asset_id.into()),
            CallArg::Integer(amount),
            CallArg::Account(beneficiary),
        ],
    ))
}

/// `Assets.create(asset_id, admin, min_balance)`
pub fn create_asset(asset_id: u32, admin: &str, min_balance: &str) -> Result<OperationDescriptor> {
    let admin = parse_account(admin)?;
    let min_balance = parse_amount("min_balance", min_balance)?;

    Ok(OperationDescriptor::new(
        ASSETS_PALLET,
        "create",
        vec![
            CallArg::Integer(asset_id.into()),
            CallArg::Address(admin),
            CallArg::Integer(min_balance),
        ],
    ))
}

/// `LiquidityPallet.deposit_liquidity(asset1, asset2, amount1, amount2)`
pub fn deposit_liquidity(
    asset1: u32,
    asset2: u32,
    amount1: &str,
    amount2: &str,
) -> Result<OperationDescriptor> {
    pool_operation("deposit_liquidity", asset1, asset2, amount1, amount2)
}

/// `LiquidityPallet.withdraw_liquidity(asset1, asset2, amount1, amount2)`
pub fn withdraw_liquidity(
    asset1: u32,
    asset2: u32,
    amount1: &str,
    amount2: &str,
) -> Result<OperationDescriptor> {
    pool_operation("withdraw_liquidity", asset1, asset2, amount1, amount2)
}

/// Shared shape of the two pool calls.
fn pool_operation(
    call: &str,
    asset1: u32,
    asset2: u32,
    amount1: &str,
    amount2: &str,
) -> Result<OperationDescriptor> {
    let amount1 = parse_amount("amount1", amount1)?;
    let amount2 = parse_amount("amount2", amount2)?;

    Ok(OperationDescriptor::new(
        LIQUIDITY_PALLET,
        call,
        vec![
            CallArg::Integer(asset1.into()),
            CallArg::Integer(asset2.into()),
            CallArg::Integer(amount1),
            CallArg::Integer(amount2),
        ],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: &str = "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY";

    #[test]
    fn amounts_must_be_positive_integers() {
        assert_eq!(parse_amount("amount", "10").unwrap(), 10);
        assert_eq!(parse_amount("amount", " 7 ").unwrap(), 7);

        for bad in ["0", "-5", "1.5", "", "ten"] {
            let err = parse_amount("amount", bad).unwrap_err();
            assert!(
                matches!(err, Error::InvalidAmount { field: "amount", ref value } if value == bad),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn amounts_above_u64_are_supported() {
        let big = u128::MAX.to_string();
        assert_eq!(parse_amount("amount", &big).unwrap(), u128::MAX);
    }

    #[test]
    fn accounts_must_be_ss58() {
        assert!(parse_account(ALICE).is_ok());
        assert!(matches!(
            parse_account("0xnot-an-account"),
            Err(Error::InvalidAccount { .. })
        ));
    }

    #[test]
    fn transfer_orders_asset_recipient_amount() {
        let descriptor = transfer_asset(1, ALICE, "100").unwrap();
        let alice = parse_account(ALICE).unwrap();

        assert_eq!(descriptor.pallet(), "LiquidityPallet");
        assert_eq!(descriptor.call(), "transfer_tokens");
        assert_eq!(
            descriptor.args(),
            &[
                CallArg::Integer(1),
                CallArg::Account(alice),
                CallArg::Integer(100)
            ]
        );
    }

    #[test]
    fn mint_orders_asset_amount_beneficiary() {
        let descriptor = mint_asset(3, ALICE, "5").unwrap();
        let alice = parse_account(ALICE).unwrap();

        assert_eq!(descriptor.to_string(), "LiquidityPallet.mint_tokens");
        assert_eq!(
            descriptor.args(),
            &[
                CallArg::Integer(3),
                CallArg::Integer(5),
                CallArg::Account(alice)
            ]
        );
    }

    #[test]
    fn mint_rejects_zero_amounts() {
        assert!(matches!(
            mint_asset(3, ALICE, "0"),
            Err(Error::InvalidAmount { field: "amount", .. })
        ));
    }

    #[test]
    fn create_uses_a_lookup_admin() {
        let descriptor = create_asset(9, ALICE, "1").unwrap();

        assert_eq!(descriptor.to_string(), "Assets.create");
        assert!(matches!(descriptor.args()[1], CallArg::Address(_)));
    }

    #[test]
    fn pool_operations_validate_both_amounts() {
        assert!(deposit_liquidity(1, 2, "10", "20").is_ok());
        assert!(matches!(
            deposit_liquidity(1, 2, "10", "-1"),
            Err(Error::InvalidAmount {
                field: "amount2",
                ..
            })
        ));
        assert!(matches!(
            withdraw_liquidity(1, 2, "0", "20"),
            Err(Error::InvalidAmount {
                field: "amount1",
                ..
            })
        ));

        let withdraw = withdraw_liquidity(1, 2, "3", "4").unwrap();
        assert_eq!(withdraw.call(), "withdraw_liquidity");
        assert_eq!(withdraw.args().len(), 4);
    }

    #[test]
    fn display_names_match_status_messages() {
        assert_eq!(Operation::MintAsset.to_string(), "Mint Asset");
        assert_eq!(Operation::TransferAsset.display_name(), "Transfer Asset");
        assert_eq!(Operation::WithdrawLiquidity.display_name(), "Withdraw Liquidity");
    }
}
