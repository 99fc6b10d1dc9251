pub const MEASUREMENTS_TABLE_NAME: &str = "Measurements";
pub const SESSION_ID: &str = "session_id";
pub const TIMESTAMP: &str = "timestamp";
pub const STATE: &str = "state";
pub const SYNCHRONIZED: &str = "synchronized";

pub const TRACKS_TABLE_NAME: &str = "Tracks";
// Session id
pub const TRACK_INDEX: &str = "track_index";
pub const LOCATIONS: &str = "locations";
pub const ALTITUDES: &str = "altitudes";
