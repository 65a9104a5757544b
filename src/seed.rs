//! Deterministic default records.
//!
//! A freshly opened database receives the same fixed records every time: an
//! administrator and a guest account, a demo world with three classic Life
//! figures, a glider pattern, and one closed session with its finished run.
//! Seeding uses a fixed timestamp so the generated session and run keys are
//! reproducible across machines and runs.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::account::{Account, Address, Email, NationalId, Password, Role};
use crate::config::DataConfig;
use crate::error::ValidationError;
use crate::grid::Grid;
use crate::pattern::Pattern;
use crate::session::{Session, SessionStatus};
use crate::simulation::{RunStatus, SimulationRun};
use crate::world::World;

/// Name of the seeded demo world.
pub const DEMO_WORLD: &str = "Demo0";
/// Name of the seeded glider pattern.
pub const GLIDER_PATTERN: &str = "Glider";

/// Fixed timestamp every seeded record is stamped with.
#[must_use]
pub fn seed_time() -> DateTime<Utc> {
    // Single valid instant, so the Option is never None.
    Utc.with_ymd_and_hms(2016, 6, 5, 10, 30, 0).single().unwrap_or_default()
}

fn seed_date() -> NaiveDate {
    seed_time().date_naive()
}

/// The administrator account, keyed by the configured admin ID.
///
/// # Errors
/// Returns a validation error only when the configured default password is
/// invalid, which [`DataConfig::validate`] already rules out.
pub fn admin_account(config: &DataConfig) -> Result<Account, ValidationError> {
    Account::new(
        &config.admin_id,
        NationalId::parse("76543210A")?,
        Email::parse("jv.admin@gmail.com")?,
        "Admin",
        "Admin",
        Address::new("30130", "Roncal", "10", "Murcia", "España"),
        NaiveDate::from_ymd_opt(1990, 1, 1).unwrap_or_default(),
        seed_date(),
        Password::new(&config.default_password)?,
        Role::Admin,
    )
}

/// The guest account, keyed by the configured guest ID.
///
/// # Errors
/// Same conditions as [`admin_account`].
pub fn guest_account(config: &DataConfig) -> Result<Account, ValidationError> {
    Account::new(
        &config.guest_id,
        NationalId::parse("06543210I")?,
        Email::parse("jv.guest@gmail.com")?,
        "Guest",
        "Guest",
        Address::new("30130", "Roncal", "10", "Murcia", "España"),
        NaiveDate::from_ymd_opt(1990, 1, 1).unwrap_or_default(),
        seed_date(),
        Password::new(&config.default_password)?,
        Role::Guest,
    )
}

/// The demo world: a 12x12 grid holding a glider, a flip-flop and a block.
///
/// # Errors
/// Never fails in practice; the grid literal below is well formed.
pub fn demo_world() -> Result<World, ValidationError> {
    let grid = Grid::from_rows(&[
        &[0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
        &[0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
        &[0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
        &[0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0],
        &[0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0],
        &[0, 0, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0],
        &[0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
        &[0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
        &[0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 0, 0],
        &[0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
        &[0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 0],
        &[0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 0],
    ])?;
    World::new(DEMO_WORLD, grid)
}

/// The glider pattern, reusable via [`World::place`].
///
/// # Errors
/// Never fails in practice; the schema literal below is well formed.
pub fn glider_pattern() -> Result<Pattern, ValidationError> {
    let schema = Grid::from_rows(&[
        &[0, 1, 0],
        &[0, 0, 1],
        &[1, 1, 1],
    ])?;
    Pattern::new(GLIDER_PATTERN, schema)
}

/// A closed session owned by the administrator, stamped with the seed time.
///
/// # Errors
/// Returns a validation error only when the configured admin ID is blank.
pub fn baseline_session(config: &DataConfig) -> Result<Session, ValidationError> {
    Session::new(&config.admin_id, seed_time(), SessionStatus::Closed)
}

/// A finished run of the demo world owned by the administrator.
///
/// # Errors
/// Returns a validation error only when the configured admin ID is blank.
pub fn baseline_run(config: &DataConfig) -> Result<SimulationRun, ValidationError> {
    SimulationRun::new(&config.admin_id, DEMO_WORLD, seed_time(), RunStatus::Finished)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Record;

    #[test]
    fn seeded_records_are_deterministic() {
        let config = DataConfig::default();

        let admin = admin_account(&config).unwrap();
        assert_eq!(admin.id, "AA0A");
        assert_eq!(admin.role, Role::Admin);
        assert!(admin.password.matches("Miau#0"));

        let guest = guest_account(&config).unwrap();
        assert_eq!(guest.id, "GG0I");
        assert_eq!(guest.role, Role::Guest);

        let session = baseline_session(&config).unwrap();
        assert_eq!(session.id(), "AA0A:20160605103000");
        assert_eq!(session.status, SessionStatus::Closed);

        let run = baseline_run(&config).unwrap();
        assert_eq!(run.id(), "AA0A:20160605103000");
        assert_eq!(run.status, RunStatus::Finished);
    }

    #[test]
    fn admin_id_matches_derivation_rule() {
        let config = DataConfig::default();
        let admin = admin_account(&config).unwrap();
        assert_eq!(
            Account::derive_id(&admin.name, &admin.surname, &admin.national_id),
            admin.id
        );
        let guest = guest_account(&config).unwrap();
        assert_eq!(
            Account::derive_id(&guest.name, &guest.surname, &guest.national_id),
            guest.id
        );
    }

    #[test]
    fn demo_world_holds_the_three_figures() {
        let world = demo_world().unwrap();
        assert_eq!(world.key(), "Demo0");
        assert_eq!(world.grid.rows(), 12);
        assert_eq!(world.grid.cols(), 12);
        // Glider (5) + flip-flop (3) + block (4).
        assert_eq!(world.grid.alive_count(), 12);
    }

    #[test]
    fn glider_pattern_stamps_into_the_demo_world() {
        let pattern = glider_pattern().unwrap();
        assert_eq!(pattern.schema.alive_count(), 5);

        let mut world = demo_world().unwrap();
        world.place(&pattern, 0, 8).unwrap();
        assert_eq!(world.grid.alive_count(), 17);
    }
}
