use crate::domain_model::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(
    Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct FriendshipId(pub uuid::Uuid);

impl FriendshipId {
    /// Time-ordered, so ids created later always compare greater.
    pub fn generate() -> Self {
        FriendshipId(uuid::Uuid::now_v7())
    }
}

impl fmt::Display for FriendshipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FriendshipId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::from_str(s).map(FriendshipId)
    }
}

// region state machine

/// State as persisted on one side of an edge.
///
/// Both mirrors of a fresh request are stored as `Pending`; the recipient's
/// side is only *reported* as requested, see [`FriendshipEdge::status`].
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FriendshipState {
    Pending,
    Accepted,
    Blocked,
}

impl FriendshipState {
    pub fn as_str(&self) -> &'static str {
        match self {
            FriendshipState::Pending => "pending",
            FriendshipState::Accepted => "accepted",
            FriendshipState::Blocked => "blocked",
        }
    }

    /// The whole transition table. Mutual operations run it against both
    /// mirrors and only write when both sides agree.
    pub fn apply(self, op: FriendshipOp) -> Result<Transition, TransitionRejected> {
        use FriendshipOp::*;
        use FriendshipState::*;

        match (self, op) {
            (Pending, Accept) => Ok(Transition::To(Accepted)),
            (Pending | Accepted, Block) => Ok(Transition::To(Blocked)),
            (_, Destroy) => Ok(Transition::Delete),
            (from, op) => Err(TransitionRejected { from, op }),
        }
    }
}

impl fmt::Display for FriendshipState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown friendship state: {0}")]
pub struct UnknownState(pub String);

impl FromStr for FriendshipState {
    type Err = UnknownState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(FriendshipState::Pending),
            "accepted" => Ok(FriendshipState::Accepted),
            "blocked" => Ok(FriendshipState::Blocked),
            other => Err(UnknownState(other.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FriendshipOp {
    Accept,
    Block,
    Destroy,
}

impl fmt::Display for FriendshipOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FriendshipOp::Accept => "accept",
            FriendshipOp::Block => "block",
            FriendshipOp::Destroy => "destroy",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Transition {
    To(FriendshipState),
    Delete,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, thiserror::Error)]
#[error("cannot {op} a {from} friendship")]
pub struct TransitionRejected {
    pub from: FriendshipState,
    pub op: FriendshipOp,
}

// endregion

// region labels

/// Status as seen by the record's owner.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FriendshipStatus {
    /// The owner sent the request.
    Pending,
    /// The owner received the request.
    Requested,
    Accepted,
    Blocked,
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FriendshipCategory {
    #[default]
    All,
    Pending,
    Requested,
    Accepted,
    Blocked,
}

impl FriendshipCategory {
    pub fn matches(self, status: FriendshipStatus) -> bool {
        match self {
            FriendshipCategory::All => true,
            FriendshipCategory::Pending => status == FriendshipStatus::Pending,
            FriendshipCategory::Requested => status == FriendshipStatus::Requested,
            FriendshipCategory::Accepted => status == FriendshipStatus::Accepted,
            FriendshipCategory::Blocked => status == FriendshipStatus::Blocked,
        }
    }
}

// endregion

/// One side of a friendship edge, owned by `owner_id`.
///
/// Fields are private: a record only changes through the constructors below
/// and [`FriendshipEdge::transition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FriendshipEdge {
    id: FriendshipId,
    owner_id: UserId,
    counterpart_id: UserId,
    state: FriendshipState,
    initiator: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl FriendshipEdge {
    /// The requester's side of a new edge.
    pub fn initiate(owner_id: UserId, counterpart_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: FriendshipId::generate(),
            owner_id,
            counterpart_id,
            state: FriendshipState::Pending,
            initiator: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// The recipient's side of the edge started by `self`.
    pub fn mirror(&self) -> Self {
        Self {
            id: FriendshipId::generate(),
            owner_id: self.counterpart_id,
            counterpart_id: self.owner_id,
            state: self.state,
            initiator: !self.initiator,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// A one-sided block with no prior relationship.
    pub fn blocked(owner_id: UserId, counterpart_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            state: FriendshipState::Blocked,
            ..Self::initiate(owner_id, counterpart_id, now)
        }
    }

    /// Rehydrates a stored row.
    pub fn from_parts(
        id: FriendshipId,
        owner_id: UserId,
        counterpart_id: UserId,
        state: FriendshipState,
        initiator: bool,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            owner_id,
            counterpart_id,
            state,
            initiator,
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> FriendshipId {
        self.id
    }

    pub fn owner_id(&self) -> UserId {
        self.owner_id
    }

    pub fn counterpart_id(&self) -> UserId {
        self.counterpart_id
    }

    pub fn state(&self) -> FriendshipState {
        self.state
    }

    pub fn initiator(&self) -> bool {
        self.initiator
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn status(&self) -> FriendshipStatus {
        match self.state {
            FriendshipState::Pending if self.initiator => FriendshipStatus::Pending,
            FriendshipState::Pending => FriendshipStatus::Requested,
            FriendshipState::Accepted => FriendshipStatus::Accepted,
            FriendshipState::Blocked => FriendshipStatus::Blocked,
        }
    }

    pub fn is_mirror_of(&self, other: &FriendshipEdge) -> bool {
        self.owner_id == other.counterpart_id && self.counterpart_id == other.owner_id
    }

    /// Runs `op` through the transition table. On `Transition::To` the record
    /// is updated in place; on `Transition::Delete` it is left untouched and
    /// the caller removes it from the store.
    pub fn transition(
        &mut self,
        op: FriendshipOp,
        now: DateTime<Utc>,
    ) -> Result<Transition, TransitionRejected> {
        let transition = self.state.apply(op)?;
        if let Transition::To(state) = transition {
            self.state = state;
            self.updated_at = now;
        }
        Ok(transition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn pair() -> (UserId, UserId) {
        (UserId::generate(), UserId::generate())
    }

    #[rstest]
    #[case(FriendshipState::Pending, FriendshipOp::Accept, Transition::To(FriendshipState::Accepted))]
    #[case(FriendshipState::Pending, FriendshipOp::Block, Transition::To(FriendshipState::Blocked))]
    #[case(FriendshipState::Accepted, FriendshipOp::Block, Transition::To(FriendshipState::Blocked))]
    #[case(FriendshipState::Pending, FriendshipOp::Destroy, Transition::Delete)]
    #[case(FriendshipState::Accepted, FriendshipOp::Destroy, Transition::Delete)]
    #[case(FriendshipState::Blocked, FriendshipOp::Destroy, Transition::Delete)]
    fn legal_transitions(
        #[case] from: FriendshipState,
        #[case] op: FriendshipOp,
        #[case] expected: Transition,
    ) {
        assert_eq!(from.apply(op), Ok(expected));
    }

    #[rstest]
    #[case(FriendshipState::Accepted, FriendshipOp::Accept)]
    #[case(FriendshipState::Blocked, FriendshipOp::Accept)]
    #[case(FriendshipState::Blocked, FriendshipOp::Block)]
    fn rejected_transitions(#[case] from: FriendshipState, #[case] op: FriendshipOp) {
        let err = from.apply(op).unwrap_err();
        assert_eq!(err, TransitionRejected { from, op });
        assert_eq!(err.to_string(), format!("cannot {op} a {from} friendship"));
    }

    #[rstest]
    fn request_sides_are_labelled_by_role() {
        let (alice, bob) = pair();
        let edge = FriendshipEdge::initiate(alice, bob, Utc::now());
        let mirror = edge.mirror();

        assert_eq!(edge.state(), FriendshipState::Pending);
        assert_eq!(mirror.state(), FriendshipState::Pending);
        assert_eq!(edge.status(), FriendshipStatus::Pending);
        assert_eq!(mirror.status(), FriendshipStatus::Requested);
        assert!(mirror.is_mirror_of(&edge));
        assert!(edge.is_mirror_of(&mirror));
        assert!(edge.id() < mirror.id());
    }

    #[rstest]
    fn transition_updates_state_and_timestamp() {
        let (alice, bob) = pair();
        let created = Utc::now();
        let mut edge = FriendshipEdge::initiate(alice, bob, created);
        let later = created + chrono::Duration::seconds(5);

        let t = edge.transition(FriendshipOp::Accept, later).unwrap();

        assert_eq!(t, Transition::To(FriendshipState::Accepted));
        assert_eq!(edge.status(), FriendshipStatus::Accepted);
        assert_eq!(edge.updated_at(), later);
        assert_eq!(edge.created_at(), created);
    }

    #[rstest]
    fn rejected_transition_leaves_record_untouched() {
        let (alice, bob) = pair();
        let mut edge = FriendshipEdge::blocked(alice, bob, Utc::now());
        let before = edge.clone();

        assert!(edge.transition(FriendshipOp::Accept, Utc::now()).is_err());
        assert_eq!(edge, before);
    }

    #[rstest]
    #[case(FriendshipCategory::All, FriendshipStatus::Requested, true)]
    #[case(FriendshipCategory::Pending, FriendshipStatus::Pending, true)]
    #[case(FriendshipCategory::Pending, FriendshipStatus::Requested, false)]
    #[case(FriendshipCategory::Requested, FriendshipStatus::Requested, true)]
    #[case(FriendshipCategory::Accepted, FriendshipStatus::Pending, false)]
    #[case(FriendshipCategory::Accepted, FriendshipStatus::Blocked, false)]
    #[case(FriendshipCategory::Blocked, FriendshipStatus::Blocked, true)]
    fn category_filter(
        #[case] category: FriendshipCategory,
        #[case] status: FriendshipStatus,
        #[case] expected: bool,
    ) {
        assert_eq!(category.matches(status), expected);
    }

    #[rstest]
    fn state_round_trips_through_its_name() {
        for state in [
            FriendshipState::Pending,
            FriendshipState::Accepted,
            FriendshipState::Blocked,
        ] {
            assert_eq!(state.as_str().parse::<FriendshipState>().unwrap(), state);
        }
        assert!("requested".parse::<FriendshipState>().is_err());
    }
}
