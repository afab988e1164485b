//! Allowed edges of the reservation, job and payment state machines.

use serde::Deserialize;

use crate::{
    entity::enums::{JobStatus, PaymentStatus, ReservationStatus},
    error::{AppError, AppResult},
};

impl ReservationStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ReservationStatus::Completed | ReservationStatus::Cancelled)
    }

    pub fn can_transition_to(self, next: ReservationStatus) -> bool {
        use ReservationStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed) | (Confirmed, Completed) | (Pending, Cancelled) | (Confirmed, Cancelled)
        )
    }

    pub fn transition(self, next: ReservationStatus) -> AppResult<ReservationStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(AppError::transition("reservation", self.as_str(), next.as_str()))
        }
    }
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Cancelled)
    }

    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Scheduled, Pending) | (Pending, Done) | (Scheduled, Cancelled) | (Pending, Cancelled)
        )
    }

    pub fn transition(self, entity: &'static str, next: JobStatus) -> AppResult<JobStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(AppError::transition(entity, self.as_str(), next.as_str()))
        }
    }
}

impl PaymentStatus {
    pub fn can_transition_to(self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, next),
            (Pending, Paid) | (Pending, Overdue) | (Overdue, Paid) | (Paid, Refunded)
        )
    }

    pub fn transition(self, next: PaymentStatus) -> AppResult<PaymentStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(AppError::transition("payment", self.as_str(), next.as_str()))
        }
    }
}

/// Operator-facing verbs on a reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationAction {
    Confirm,
    Complete,
    Cancel,
}

impl ReservationAction {
    pub fn target(self) -> ReservationStatus {
        match self {
            ReservationAction::Confirm => ReservationStatus::Confirmed,
            ReservationAction::Complete => ReservationStatus::Completed,
            ReservationAction::Cancel => ReservationStatus::Cancelled,
        }
    }
}

/// Operator-facing verbs on an installation or pickup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobAction {
    Start,
    Finish,
    Cancel,
}

impl JobAction {
    pub fn target(self) -> JobStatus {
        match self {
            JobAction::Start => JobStatus::Pending,
            JobAction::Finish => JobStatus::Done,
            JobAction::Cancel => JobStatus::Cancelled,
        }
    }
}

/// Status walk that completes a reservation once both jobs are done.
///
/// A still-pending reservation is confirmed on the way; terminal ones are left alone.
pub fn completion_path(current: ReservationStatus) -> &'static [ReservationStatus] {
    match current {
        ReservationStatus::Pending => &[ReservationStatus::Confirmed, ReservationStatus::Completed],
        ReservationStatus::Confirmed => &[ReservationStatus::Completed],
        ReservationStatus::Completed | ReservationStatus::Cancelled => &[],
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::Iterable;

    use super::*;

    #[test]
    fn reservation_graph() {
        use ReservationStatus::*;
        let allowed = [
            (Pending, Confirmed),
            (Confirmed, Completed),
            (Pending, Cancelled),
            (Confirmed, Cancelled),
        ];
        for from in ReservationStatus::iter() {
            for to in ReservationStatus::iter() {
                assert_eq!(
                    from.can_transition_to(to),
                    allowed.contains(&(from, to)),
                    "{} -> {}",
                    from.as_str(),
                    to.as_str()
                );
            }
        }
    }

    #[test]
    fn pending_cannot_jump_to_completed() {
        let err = ReservationStatus::Pending
            .transition(ReservationStatus::Completed)
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::InvalidTransition { ref from, ref to, .. } if from == "pending" && to == "completed"
        ));
    }

    #[test]
    fn terminal_states_have_no_exits() {
        for status in [ReservationStatus::Completed, ReservationStatus::Cancelled] {
            assert!(status.is_terminal());
            assert!(ReservationStatus::iter().all(|next| !status.can_transition_to(next)));
        }
        for status in [JobStatus::Done, JobStatus::Cancelled] {
            assert!(status.is_terminal());
            assert!(JobStatus::iter().all(|next| !status.can_transition_to(next)));
        }
    }

    #[test]
    fn job_graph() {
        use JobStatus::*;
        assert!(Scheduled.can_transition_to(Pending));
        assert!(Pending.can_transition_to(Done));
        assert!(Scheduled.can_transition_to(Cancelled));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(!Scheduled.can_transition_to(Done));
        assert!(!Pending.can_transition_to(Scheduled));
        assert!(JobAction::Finish.target() == Done);
    }

    #[test]
    fn payment_graph() {
        use PaymentStatus::*;
        assert!(Paid.transition(Refunded).is_ok());
        assert!(Pending.transition(Refunded).is_err());
        assert!(Refunded.transition(Paid).is_err());
        assert!(Overdue.transition(Paid).is_ok());
    }

    #[test]
    fn completion_path_only_uses_legal_edges() {
        for start in ReservationStatus::iter() {
            let mut current = start;
            for next in completion_path(start) {
                current = current.transition(*next).unwrap();
            }
            if !start.is_terminal() {
                assert_eq!(current, ReservationStatus::Completed);
            }
        }
    }
}
