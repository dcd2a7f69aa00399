//! Inline aggregate execution without persistence.

/// Decide and apply a command on an aggregate in one step (no IO, no async).
///
/// Handy in tests and for previews. The full pipeline with persistence and
/// publication lives in infra's `CommandDispatcher`.
pub fn execute<A>(aggregate: &mut A, command: &A::Command) -> Result<Vec<A::Event>, A::Error>
where
    A: cargohub_core::Aggregate,
{
    let events = A::handle(aggregate, command)?;
    for ev in &events {
        A::apply(aggregate, ev);
    }
    Ok(events)
}
