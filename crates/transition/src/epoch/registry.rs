//! Registry maintenance at the epoch boundary: the activation queue, forced
//! ejections, and the correlated slashing penalty.

use cairn_types::{
    BeaconState, Preset, Spec, ValidatorIndex,
    constants::FAR_FUTURE_EPOCH,
    misc::compute_activation_exit_epoch,
    spec::ForkName,
};

use crate::Error;

pub fn process_registry_updates<P: Preset>(
    spec: &Spec,
    state: &mut BeaconState<P>,
) -> Result<(), Error> {
    let current_epoch = state.current_epoch();

    // Process activation eligibility and ejections
    let mut ejections: Vec<ValidatorIndex> = Vec::new();
    for (index, validator) in state.validators_mut().iter_mut().enumerate() {
        if validator.activation_eligibility_epoch == FAR_FUTURE_EPOCH
            && validator.effective_balance == spec.phase0.max_effective_balance
        {
            validator.activation_eligibility_epoch = current_epoch + 1;
        }
        if validator.is_active_at(current_epoch)
            && validator.effective_balance <= spec.phase0.ejection_balance
        {
            ejections.push(index as u64);
        }
    }
    for index in ejections {
        state.initiate_validator_exit(spec, index)?;
    }

    // Queue validators eligible for activation and not yet dequeued
    let finalized_epoch = state.finalized_checkpoint().epoch;
    let mut activation_queue = state
        .validators()
        .iter()
        .enumerate()
        .filter(|(_, validator)| {
            validator.activation_eligibility_epoch <= finalized_epoch
                && validator.activation_epoch == FAR_FUTURE_EPOCH
        })
        .map(|(index, validator)| (validator.activation_eligibility_epoch, index))
        .collect::<Vec<_>>();
    activation_queue.sort();

    // Dequeue in order up to the churn limit
    let mut churn_limit = state.get_validator_churn_limit(spec);
    if state.fork_name() >= ForkName::Deneb {
        churn_limit = churn_limit.min(spec.deneb.max_per_epoch_activation_churn_limit);
    }
    let activation_epoch = compute_activation_exit_epoch(spec, current_epoch);
    for (_, index) in activation_queue.into_iter().take(churn_limit as usize) {
        state.validators_mut()[index].activation_epoch = activation_epoch;
    }
    Ok(())
}

/// Apply the correlated penalty to validators halfway through the slashing
/// window. The arithmetic is quantized through the balance increment and
/// widened to avoid overflow on large registries.
pub fn process_slashings<P: Preset>(spec: &Spec, state: &mut BeaconState<P>) -> Result<(), Error> {
    let epoch = state.current_epoch();
    let total_balance = state.get_total_active_balance(spec);
    let multiplier = spec.proportional_slashing_multiplier_for(state.fork_name());
    let slashings_sum: u64 = state.slashings().iter().sum();
    let adjusted_total_slashing_balance =
        slashings_sum.saturating_mul(multiplier).min(total_balance);

    let increment = spec.phase0.effective_balance_increment;
    for index in 0..state.validators().len() {
        let validator = &state.validators()[index];
        if !validator.slashed
            || epoch + P::epochs_per_slashings_vector() / 2 != validator.withdrawable_epoch
        {
            continue;
        }
        let penalty_numerator = (validator.effective_balance / increment) as u128
            * adjusted_total_slashing_balance as u128;
        let penalty = (penalty_numerator / total_balance as u128) as u64 * increment;
        state.decrease_balance(index as u64, penalty)?;
    }
    Ok(())
}
