use serde::{Deserialize, Serialize};

/// A bookable room as served by the hotel API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Room {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub number: String,
    #[serde(rename = "type", default)]
    pub room_type: String,
    #[serde(default)]
    pub capacity: u32,
    #[serde(rename = "price")]
    pub nightly_rate: f64,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default = "default_true")]
    pub available: bool,
}

fn default_true() -> bool {
    true
}

impl Room {
    /// A rate that can price a stay: finite and above zero.
    pub fn has_valid_rate(&self) -> bool {
        self.nightly_rate.is_finite() && self.nightly_rate > 0.0
    }
}

impl std::fmt::Display for Room {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "# Room {} ({})", self.number, self.room_type)?;
        writeln!(f, "ID: {}", self.id)?;
        writeln!(f, "Price: ${:.2} per night", self.nightly_rate)?;
        writeln!(f, "Capacity: {} guest(s)", self.capacity)?;
        if !self.amenities.is_empty() {
            writeln!(f, "Amenities: {}", self.amenities.join(", "))?;
        }
        if !self.available {
            writeln!(f, "Currently not accepting bookings")?;
        }
        Ok(())
    }
}

/// Client-side catalogue filter. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct RoomFilter {
    pub room_type: Option<String>,
    pub min_capacity: Option<u32>,
    pub max_price: Option<f64>,
}

impl RoomFilter {
    pub fn matches(&self, room: &Room) -> bool {
        let type_ok = match self.room_type.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(t) => room.room_type.eq_ignore_ascii_case(t),
        };
        let capacity_ok = self.min_capacity.is_none_or(|min| room.capacity >= min);
        let price_ok = self.max_price.is_none_or(|max| room.nightly_rate <= max);
        type_ok && capacity_ok && price_ok
    }

    pub fn apply<'a>(&self, rooms: &'a [Room]) -> Vec<&'a Room> {
        rooms.iter().filter(|r| self.matches(r)).collect()
    }
}
