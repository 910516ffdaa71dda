//! Record ID definitions.

use crate::define_id;

define_id!(
    /// A registered user.
    UserId,
    "usr"
);
define_id!(
    /// A signed-in session.
    SessionId,
    "ses"
);
define_id!(
    /// One animal.
    CattleId,
    "cat"
);
define_id!(
    /// One treatment logged against an animal.
    TreatmentId,
    "trt"
);
define_id!(
    /// Correlates logs and error responses for one HTTP request.
    RequestId,
    "req"
);
