use cairn_types::{
    BeaconState, ExecutionAddress, Preset, SignedBeaconBlock, Spec, Withdrawal,
};

use crate::{Error, error::ensure_rule};

/// The withdrawals this state owes the execution layer: the partial/full
/// sweep over at most ``max_validators_per_withdrawals_sweep`` validators.
pub fn get_expected_withdrawals<P: Preset>(
    spec: &Spec,
    state: &BeaconState<P>,
) -> Result<Vec<Withdrawal>, Error> {
    let epoch = state.current_epoch();
    let mut withdrawal_index = *state.next_withdrawal_index()?;
    let mut validator_index = *state.next_withdrawal_validator_index()?;
    let mut withdrawals: Vec<Withdrawal> = Vec::new();

    let validator_count = state.validators().len() as u64;
    let bound = validator_count.min(spec.capella.max_validators_per_withdrawals_sweep);
    for _ in 0..bound {
        let validator = &state.validators()[validator_index as usize];
        let balance = state.balances()[validator_index as usize];
        let address =
            ExecutionAddress::from_slice(&validator.withdrawal_credentials[12..]);

        if validator.is_fully_withdrawable_at(balance, epoch) {
            withdrawals.push(Withdrawal {
                index: withdrawal_index,
                validator_index,
                address,
                amount: balance,
            });
            withdrawal_index += 1;
        } else if validator.is_partially_withdrawable(spec, balance) {
            withdrawals.push(Withdrawal {
                index: withdrawal_index,
                validator_index,
                address,
                amount: balance - spec.phase0.max_effective_balance,
            });
            withdrawal_index += 1;
        }
        if withdrawals.len() as u64 == P::max_withdrawals_per_payload() {
            break;
        }
        validator_index = (validator_index + 1) % validator_count;
    }
    Ok(withdrawals)
}

/// Check the payload's withdrawals against the sweep and settle them.
pub fn process_withdrawals<P: Preset>(
    spec: &Spec,
    state: &mut BeaconState<P>,
    block: &SignedBeaconBlock<P>,
) -> Result<(), Error> {
    let payload_withdrawals: Vec<Withdrawal> = match block {
        SignedBeaconBlock::Capella(block) => {
            block.message.body.execution_payload.withdrawals.to_vec()
        }
        SignedBeaconBlock::Deneb(block) => {
            block.message.body.execution_payload.withdrawals.to_vec()
        }
        _ => {
            return Err(Error::Internal(
                "withdrawal processing on a pre-Capella block".into(),
            ));
        }
    };

    let expected = get_expected_withdrawals(spec, state)?;
    ensure_rule!(
        payload_withdrawals == expected,
        "payload withdrawals do not match the expected sweep"
    );

    for withdrawal in &expected {
        state.decrease_balance(withdrawal.validator_index, withdrawal.amount)?;
    }

    // Bookkeeping for the next sweep
    if let Some(latest) = expected.last() {
        *state.next_withdrawal_index_mut()? = latest.index + 1;
    }
    let validator_count = state.validators().len() as u64;
    let next_validator_index = if expected.len() as u64 == P::max_withdrawals_per_payload() {
        expected
            .last()
            .map(|withdrawal| (withdrawal.validator_index + 1) % validator_count)
            .unwrap_or(0)
    } else {
        (*state.next_withdrawal_validator_index()?
            + spec.capella.max_validators_per_withdrawals_sweep)
            % validator_count
    };
    *state.next_withdrawal_validator_index_mut()? = next_validator_index;
    Ok(())
}
