use common_errors::LendingError;
use common_events::Event;
use common_structs::AccountId;

use crate::{cache::Cache, validation};

pub trait EModeModule: validation::ValidationModule {
    /// Moves `caller` into e-mode category `category_id`, or out of e-mode with 0.
    ///
    /// Every borrowed asset must belong to the new category, and the account
    /// must stay healthy once valued with the new parameters.
    fn process_set_user_e_mode(
        &self,
        cache: &mut Cache<Self>,
        caller: AccountId,
        category_id: u8,
    ) -> Result<(), LendingError> {
        let account = cache.get_cached_account(caller);
        self.validate_set_user_e_mode(cache, &account, category_id)?;

        cache.get_cached_account_mut(caller).e_mode_category = match category_id {
            0 => None,
            id => Some(id),
        };
        cache.push_event(Event::UserEModeSet {
            user: caller,
            category_id,
        });

        let account = cache.get_cached_account(caller);
        if account.is_borrowing_any() {
            let data = self.calculate_user_account_data(cache, &account)?;
            self.require_health_factor_above_one(&data.health_factor)?;
        }
        Ok(())
    }
}
