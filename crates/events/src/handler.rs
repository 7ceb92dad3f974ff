/// Execute an aggregate command deterministically (no IO).
///
/// Decides with `handle`, then evolves the aggregate with `apply` for every returned
/// event. Services use this to transition an aggregate before persisting its snapshot.
pub fn execute<A>(aggregate: &mut A, command: &A::Command) -> Result<Vec<A::Event>, A::Error>
where
    A: farmlink_core::Aggregate,
{
    let events = A::handle(aggregate, command)?;
    for ev in &events {
        A::apply(aggregate, ev);
    }
    Ok(events)
}
