use crate::{Effect, HarvestState, Msg};

/// Pure update function: applies one tick's observation to the state and
/// returns any effects for the runner to execute.
pub fn update(mut state: HarvestState, msg: Msg) -> (HarvestState, Vec<Effect>) {
    let effects = match msg {
        Msg::RowsObserved(rows) => {
            let current = rows.len();
            let last = state.last_row_count();

            // Earlier rows are never reprocessed; the view may reorder what
            // it already showed, so only the count and the trailing rows are
            // trusted.
            let accepted = if current > last {
                state.process_new_rows(&rows[last..current])
            } else {
                0
            };

            let mut effects = Vec::new();
            if accepted > 0 {
                state.mark_progress(current);
                if state.flush_due() {
                    state.reset_flush_counter();
                    effects.push(Effect::Flush);
                }
            } else {
                // Raw row growth without a newly accepted identity is not
                // progress; a view that re-renders known rows forever must
                // still run out of attempts.
                effects.extend(stall(&mut state));
            }
            effects
        }
        Msg::ObservationFailed => stall(&mut state),
    };

    (state, effects)
}

fn stall(state: &mut HarvestState) -> Vec<Effect> {
    let exhausted = state.mark_stall();
    if exhausted {
        return Vec::new();
    }
    let interval = state.settings().next_page_interval;
    if interval > 0 && state.stall_attempts() % interval == 0 {
        vec![Effect::RequestNextPage]
    } else {
        Vec::new()
    }
}
