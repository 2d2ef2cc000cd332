//! Recreate-coin transaction: replaces an owned coin with a fresh record
//! under a new identifier, minting the new initial supply to the owner.

use crate::core::coin::{
    coin_display, max_coin_supply, min_coin_reserve, min_coin_supply, CoinReader, MAX_CRR,
    MIN_CRR,
};
use crate::core::commission::{
    check_reserve_underflow, commission_error_response, commission_in_gas_coin,
};
use crate::core::response::{info_map, Response, ResponseCode};
use crate::core::state::{CheckState, ExecutionState};
use crate::core::transaction::{base_tags, TotalSpend, Transaction};
use crate::core::types::{CoinId, CoinSymbol, BASE_COIN_SYMBOL};
use crate::core::BlockContext;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecreateCoinData {
    /// Symbol of the coin being recreated; must resolve to an existing coin
    /// owned by the sender.
    pub symbol: CoinSymbol,
    #[serde(default, with = "crate::core::types::dec_opt")]
    pub initial_amount: Option<BigUint>,
    #[serde(default, with = "crate::core::types::dec_opt")]
    pub initial_reserve: Option<BigUint>,
    pub constant_reserve_ratio: u32,
    #[serde(default, with = "crate::core::types::dec_opt")]
    pub max_supply: Option<BigUint>,
}

impl RecreateCoinData {
    /// Structural validation, supply-window checks and symbol ownership.
    pub fn basic_check(&self, tx: &Transaction, view: &CheckState<'_>) -> Option<Response> {
        let (initial_amount, initial_reserve, max_supply) =
            match (&self.initial_amount, &self.initial_reserve, &self.max_supply) {
                (Some(a), Some(r), Some(m)) => (a, r, m),
                _ => {
                    return Some(Response::error(
                        ResponseCode::DecodeError,
                        "Incorrect tx data",
                    ))
                }
            };

        if self.constant_reserve_ratio < MIN_CRR || self.constant_reserve_ratio > MAX_CRR {
            return Some(Response::error(
                ResponseCode::WrongCrr,
                format!(
                    "Constant Reserve Ratio should be between {} and {}",
                    MIN_CRR, MAX_CRR
                ),
            ));
        }

        if *initial_amount < min_coin_supply() || initial_amount > max_supply {
            return Some(Response::error(
                ResponseCode::WrongCoinSupply,
                format!(
                    "Coin supply should be between {} and {}",
                    min_coin_supply(),
                    max_supply
                ),
            ));
        }

        if *max_supply > max_coin_supply() {
            return Some(Response::error(
                ResponseCode::WrongCoinSupply,
                format!("Max coin supply should be less than {}", max_coin_supply()),
            ));
        }

        if *initial_reserve < min_coin_reserve() {
            return Some(Response::error(
                ResponseCode::WrongCoinSupply,
                format!(
                    "Coin reserve should be greater than or equal to {}",
                    min_coin_reserve()
                ),
            ));
        }

        let sender = match tx.sender() {
            Ok(sender) => sender,
            Err(e) => {
                return Some(Response::error(
                    ResponseCode::DecodeError,
                    format!("Cannot resolve sender: {}", e),
                ))
            }
        };

        if view.get_coin_by_symbol(&self.symbol).is_none() {
            return Some(Response::error(
                ResponseCode::CoinNotExists,
                format!("Coin {} not exists", self.symbol),
            ));
        }

        let owns = view
            .get_symbol_info(&self.symbol)
            .and_then(|info| info.owner_address)
            .map(|owner| owner == sender)
            .unwrap_or(false);
        if !owns {
            return Some(Response::error(
                ResponseCode::IsNotOwnerOfCoin,
                "Sender is not owner of coin",
            ));
        }

        None
    }

    /// Reports every debit this transaction would cause: the reserve
    /// contribution in base coin and the commission in the gas coin.
    pub fn total_spend(
        &self,
        tx: &Transaction,
        view: &CheckState<'_>,
    ) -> Result<TotalSpend, Box<Response>> {
        if let Some(resp) = self.basic_check(tx, view) {
            return Err(Box::new(resp));
        }
        let initial_reserve = match &self.initial_reserve {
            Some(reserve) => reserve.clone(),
            None => {
                return Err(Box::new(Response::error(
                    ResponseCode::DecodeError,
                    "Incorrect tx data",
                )))
            }
        };
        let base_commission = tx.commission_in_base_coin();
        let commission = commission_in_gas_coin(view, tx.gas_coin, &base_commission)
            .map_err(|e| Box::new(commission_error_response(&e)))?;

        let mut spend = TotalSpend::default();
        spend.add(CoinId::BASE, initial_reserve);
        spend.add(tx.gas_coin, commission);
        Ok(spend)
    }

    pub fn run(
        &self,
        tx: &Transaction,
        state: &ExecutionState<'_>,
        ctx: &mut BlockContext,
    ) -> Response {
        let view = state.check_view();

        let sender = match tx.sender() {
            Ok(sender) => sender,
            Err(e) => {
                return Response::error(
                    ResponseCode::DecodeError,
                    format!("Cannot resolve sender: {}", e),
                )
            }
        };

        if let Some(resp) = self.basic_check(tx, &view) {
            return resp;
        }
        let (initial_amount, initial_reserve, max_supply) =
            match (&self.initial_amount, &self.initial_reserve, &self.max_supply) {
                (Some(a), Some(r), Some(m)) => (a, r, m),
                _ => return Response::error(ResponseCode::DecodeError, "Incorrect tx data"),
            };

        let base_commission = tx.commission_in_base_coin();
        if !tx.gas_coin.is_base_coin() {
            if let Some(gas_coin) = view.get_coin(tx.gas_coin) {
                if let Err(e) = check_reserve_underflow(&gas_coin, &base_commission) {
                    return commission_error_response(&e);
                }
            }
        }
        let commission = match commission_in_gas_coin(&view, tx.gas_coin, &base_commission) {
            Ok(commission) => commission,
            Err(e) => return commission_error_response(&e),
        };

        if view.get_balance(&sender, tx.gas_coin) < commission {
            return Response::error_with_info(
                ResponseCode::InsufficientFunds,
                format!(
                    "Insufficient funds for sender account: {}. Wanted {} {}",
                    sender,
                    commission,
                    coin_display(&view, tx.gas_coin)
                ),
                info_map(&[
                    ("sender", sender.clone()),
                    ("needed_value", commission.to_string()),
                    ("gas_coin", coin_display(&view, tx.gas_coin)),
                ]),
            );
        }

        if view.get_balance(&sender, CoinId::BASE) < *initial_reserve {
            return Response::error_with_info(
                ResponseCode::InsufficientFunds,
                format!(
                    "Insufficient funds for sender account: {}. Wanted {} {}",
                    sender, initial_reserve, BASE_COIN_SYMBOL
                ),
                info_map(&[
                    ("sender", sender.clone()),
                    ("needed_reserve", initial_reserve.to_string()),
                    ("base_coin", BASE_COIN_SYMBOL.to_string()),
                ]),
            );
        }

        if tx.gas_coin.is_base_coin() {
            let total_tx_cost = initial_reserve + &commission;
            if view.get_balance(&sender, CoinId::BASE) < total_tx_cost {
                return Response::error_with_info(
                    ResponseCode::InsufficientFunds,
                    format!(
                        "Insufficient funds for sender account: {}. Wanted {} {}",
                        sender, total_tx_cost, BASE_COIN_SYMBOL
                    ),
                    info_map(&[
                        ("sender", sender.clone()),
                        ("needed_value", total_tx_cost.to_string()),
                        ("gas_coin", BASE_COIN_SYMBOL.to_string()),
                    ]),
                );
            }
        }

        let mut tags = base_tags(tx.tx_type(), &sender);

        if let Some(deliver) = state.deliver_view() {
            ctx.reward_pool += &base_commission;

            if !tx.gas_coin.is_base_coin() {
                deliver.coins.sub_reserve(tx.gas_coin, &base_commission);
                deliver.coins.sub_volume(tx.gas_coin, &commission);
            }

            deliver
                .accounts
                .sub_balance(&sender, CoinId::BASE, initial_reserve);
            deliver.accounts.sub_balance(&sender, tx.gas_coin, &commission);

            let coin_id = deliver.app.get_next_coin_id();
            deliver.coins.recreate(
                coin_id,
                &self.symbol,
                initial_amount.clone(),
                self.constant_reserve_ratio,
                initial_reserve.clone(),
                max_supply.clone(),
            );
            deliver.app.set_coins_count(coin_id.0);
            deliver.accounts.add_balance(&sender, coin_id, initial_amount);
            deliver.accounts.set_nonce(&sender, tx.nonce);

            tags.push(crate::core::response::Tag::new(
                "tx.coin",
                self.symbol.clone(),
            ));
        }

        Response::ok(tx.gas(), tags)
    }
}
