//! Declare-candidacy transaction: registers a validator candidate with a
//! self-delegated stake.

use crate::core::candidates::{candidates_count_for_block, MAX_COMMISSION, MIN_COMMISSION};
use crate::core::coin::{coin_display, CoinReader};
use crate::core::commission::{
    check_reserve_underflow, commission_error_response, commission_in_gas_coin,
};
use crate::core::formula::{calculate_sale_return, FormulaError};
use crate::core::response::{info_map, Response, ResponseCode};
use crate::core::state::{CheckState, ExecutionState};
use crate::core::transaction::{base_tags, TotalSpend, Transaction};
use crate::core::types::{Address, CoinId, Pubkey};
use crate::core::BlockContext;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclareCandidacyData {
    /// Address that will receive validator rewards.
    pub reward_address: Address,
    pub pubkey: Pubkey,
    /// Reward commission, integer percent.
    pub commission: u32,
    /// Coin the stake is denominated in.
    pub coin: CoinId,
    #[serde(default, with = "crate::core::types::dec_opt")]
    pub stake: Option<BigUint>,
}

impl DeclareCandidacyData {
    /// Structural and state-existence validation. Reads only; no funds
    /// checks here.
    pub fn basic_check(&self, _tx: &Transaction, view: &CheckState<'_>) -> Option<Response> {
        if self.stake.is_none() {
            return Some(Response::error(ResponseCode::DecodeError, "Incorrect tx data"));
        }

        if !view.coin_exists(self.coin) {
            return Some(Response::error_with_info(
                ResponseCode::CoinNotExists,
                format!("Coin {} not exists", self.coin),
                info_map(&[("coin", self.coin.to_string())]),
            ));
        }

        if view.candidate_exists(&self.pubkey) {
            return Some(Response::error_with_info(
                ResponseCode::CandidateExists,
                format!(
                    "Candidate with such public key ({}) already exists",
                    self.pubkey
                ),
                info_map(&[("public_key", self.pubkey.clone())]),
            ));
        }

        if !(MIN_COMMISSION..=MAX_COMMISSION).contains(&self.commission) {
            return Some(Response::error_with_info(
                ResponseCode::WrongCommission,
                format!(
                    "Commission should be between {} and {}",
                    MIN_COMMISSION, MAX_COMMISSION
                ),
                info_map(&[("got_commission", self.commission.to_string())]),
            ));
        }

        None
    }

    /// Values the stake in base coin. Stake in the base coin passes through;
    /// any other coin is valued along its bonding curve.
    fn stake_base_value(
        &self,
        view: &CheckState<'_>,
        sender: &Address,
        stake: &BigUint,
    ) -> Result<BigUint, Box<Response>> {
        if self.coin.is_base_coin() {
            return Ok(stake.clone());
        }
        let coin = match view.get_coin(self.coin) {
            Some(coin) => coin,
            None => {
                return Err(Box::new(Response::error_with_info(
                    ResponseCode::CoinNotExists,
                    format!("Coin {} not exists", self.coin),
                    info_map(&[("coin", self.coin.to_string())]),
                )))
            }
        };
        match calculate_sale_return(&coin.volume, &coin.reserve, coin.crr, stake) {
            Ok(value) => Ok(value),
            // A stake above the whole circulating volume cannot be held
            Err(FormulaError::AmountTooLarge { .. }) => {
                Err(Box::new(insufficient_funds(sender, stake, &coin.full_symbol())))
            }
            Err(e) => Err(Box::new(Response::error(
                ResponseCode::CoinReserveNotSufficient,
                e.to_string(),
            ))),
        }
    }

    /// Reports every debit this transaction would cause: the stake in its
    /// coin and the commission in the gas coin, merged when they coincide.
    pub fn total_spend(
        &self,
        tx: &Transaction,
        view: &CheckState<'_>,
    ) -> Result<TotalSpend, Box<Response>> {
        if let Some(resp) = self.basic_check(tx, view) {
            return Err(Box::new(resp));
        }
        let stake = match &self.stake {
            Some(stake) => stake.clone(),
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
        spend.add(self.coin, stake);
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
        let stake = match &self.stake {
            Some(stake) => stake,
            None => return Response::error(ResponseCode::DecodeError, "Incorrect tx data"),
        };

        // Capacity: past the per-height cap a newcomer must out-stake the
        // weakest registered candidate.
        let max_candidates = candidates_count_for_block(ctx.height);
        let stake_base = match self.stake_base_value(&view, &sender, stake) {
            Ok(value) => value,
            Err(resp) => return *resp,
        };
        if view.candidates_count() >= max_candidates
            && !view.is_new_candidate_stake_sufficient(&stake_base, max_candidates)
        {
            return Response::error(ResponseCode::TooLowStake, "Given stake is too low");
        }

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

        if view.get_balance(&sender, self.coin) < *stake {
            return insufficient_funds(&sender, stake, &coin_display(&view, self.coin));
        }

        if view.get_balance(&sender, tx.gas_coin) < commission {
            return insufficient_funds(&sender, &commission, &coin_display(&view, tx.gas_coin));
        }

        if self.coin == tx.gas_coin {
            let total_tx_cost = stake + &commission;
            if view.get_balance(&sender, tx.gas_coin) < total_tx_cost {
                return insufficient_funds(
                    &sender,
                    &total_tx_cost,
                    &coin_display(&view, tx.gas_coin),
                );
            }
        }

        if let Some(deliver) = state.deliver_view() {
            ctx.reward_pool += &base_commission;

            if !tx.gas_coin.is_base_coin() {
                deliver.coins.sub_reserve(tx.gas_coin, &base_commission);
                deliver.coins.sub_volume(tx.gas_coin, &commission);
            }

            deliver.accounts.sub_balance(&sender, self.coin, stake);
            deliver.accounts.sub_balance(&sender, tx.gas_coin, &commission);
            deliver
                .candidates
                .create(&self.reward_address, &sender, &self.pubkey, self.commission);
            deliver.candidates.delegate(
                &sender,
                &self.pubkey,
                self.coin,
                stake.clone(),
                stake_base,
            );
            deliver.accounts.set_nonce(&sender, tx.nonce);
        }

        Response::ok(tx.gas(), base_tags(tx.tx_type(), &sender))
    }
}

fn insufficient_funds(sender: &str, needed: &BigUint, coin: &str) -> Response {
    Response::error_with_info(
        ResponseCode::InsufficientFunds,
        format!(
            "Insufficient funds for sender account: {}. Wanted {} {}",
            sender, needed, coin
        ),
        info_map(&[
            ("sender", sender.to_string()),
            ("needed_value", needed.to_string()),
            ("coin", coin.to_string()),
        ]),
    )
}
