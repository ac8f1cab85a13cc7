//! Core types shared across DRC components
//!
//! Every entity is a plain value: state changes by replacing the snapshot
//! that holds it, never through shared references.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Geometry
// ============================================================================

/// 3D position (degrees, meters above ground)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPosition {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
}

/// 2D map coordinate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

// ============================================================================
// Fleet
// ============================================================================

/// Drone role within the fleet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DroneCategory {
    Surveillance,
    Scanner,
    NetworkExtender,
    Relief,
}

impl DroneCategory {
    /// All categories in roster order
    pub const ALL: [DroneCategory; 4] = [
        DroneCategory::Surveillance,
        DroneCategory::Scanner,
        DroneCategory::NetworkExtender,
        DroneCategory::Relief,
    ];

    /// Prefix used in drone ids (`SUR-001`)
    pub fn id_prefix(&self) -> &'static str {
        match self {
            DroneCategory::Surveillance => "SUR",
            DroneCategory::Scanner => "SCN",
            DroneCategory::NetworkExtender => "NET",
            DroneCategory::Relief => "REL",
        }
    }

    /// Prefix used in drone display names (`Surveillance 1`)
    pub fn display_name(&self) -> &'static str {
        match self {
            DroneCategory::Surveillance => "Surveillance",
            DroneCategory::Scanner => "Scanner",
            DroneCategory::NetworkExtender => "NetExtend",
            DroneCategory::Relief => "Relief",
        }
    }
}

impl std::fmt::Display for DroneCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DroneCategory::Surveillance => write!(f, "surveillance"),
            DroneCategory::Scanner => write!(f, "scanner"),
            DroneCategory::NetworkExtender => write!(f, "network-extender"),
            DroneCategory::Relief => write!(f, "relief"),
        }
    }
}

/// Operational status of a drone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DroneStatus {
    Active,
    Inactive,
    Maintenance,
    Emergency,
}

/// Mission phase label carried by drones and overlays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissionPhase {
    Surveillance,
    Search,
    Relief,
}

impl MissionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissionPhase::Surveillance => "surveillance",
            MissionPhase::Search => "search",
            MissionPhase::Relief => "relief",
        }
    }
}

impl std::fmt::Display for MissionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dashboard-level phase. `Monitoring` watches sensors only and has no
/// mission phase of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationsPhase {
    Monitoring,
    Surveillance,
    Search,
    Relief,
}

impl OperationsPhase {
    /// Mission phase applied to the fleet when this phase is entered
    pub fn mission_phase(&self) -> Option<MissionPhase> {
        match self {
            OperationsPhase::Monitoring => None,
            OperationsPhase::Surveillance => Some(MissionPhase::Surveillance),
            OperationsPhase::Search => Some(MissionPhase::Search),
            OperationsPhase::Relief => Some(MissionPhase::Relief),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationsPhase::Monitoring => "monitoring",
            OperationsPhase::Surveillance => "surveillance",
            OperationsPhase::Search => "search",
            OperationsPhase::Relief => "relief",
        }
    }
}

impl From<MissionPhase> for OperationsPhase {
    fn from(phase: MissionPhase) -> Self {
        match phase {
            MissionPhase::Surveillance => OperationsPhase::Surveillance,
            MissionPhase::Search => OperationsPhase::Search,
            MissionPhase::Relief => OperationsPhase::Relief,
        }
    }
}

impl std::fmt::Display for OperationsPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OperationsPhase {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "monitoring" => Ok(OperationsPhase::Monitoring),
            "surveillance" => Ok(OperationsPhase::Surveillance),
            "search" => Ok(OperationsPhase::Search),
            "relief" => Ok(OperationsPhase::Relief),
            other => Err(format!("unknown phase: {}", other)),
        }
    }
}

/// On-board sensor readings of a drone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorBundle {
    pub thermal: f64,
    pub infrared: f64,
    pub signal_strength: Option<f64>,
    pub camera_url: String,
    pub thermal_image_url: Option<String>,
    pub body_scan_image_url: Option<String>,
}

/// Relief payload type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadKind {
    Medical,
    Food,
    Water,
    None,
}

/// Payload carried by a drone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadStatus {
    #[serde(rename = "type")]
    pub kind: PayloadKind,
    pub attached: bool,
    pub capacity: u32,
    pub delivered: u32,
}

impl PayloadStatus {
    /// No payload attached
    pub fn empty() -> Self {
        Self {
            kind: PayloadKind::None,
            attached: false,
            capacity: 0,
            delivered: 0,
        }
    }
}

/// A simulated drone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Drone {
    pub id: String,
    pub name: String,
    pub category: DroneCategory,
    pub position: GeoPosition,
    /// Battery percentage, always within [0, 100]
    pub battery: f64,
    pub status: DroneStatus,
    pub mission_phase: MissionPhase,
    pub sensors: SensorBundle,
    pub payload: PayloadStatus,
    pub last_update: DateTime<Utc>,
    /// Ground speed (m/s)
    pub speed: f64,
    /// Heading in degrees, [0, 360)
    pub heading: f64,
}

impl Drone {
    pub fn is_active(&self) -> bool {
        self.status == DroneStatus::Active
    }
}

/// Status of a ground network extender node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtenderStatus {
    Active,
    Inactive,
}

/// Network extender node providing connectivity in the search phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkExtender {
    pub id: String,
    pub name: String,
    pub position: LatLng,
    /// Coverage radius (meters)
    pub coverage: f64,
    pub status: ExtenderStatus,
    pub battery: f64,
    /// Signal strength percentage, [0, 100]
    pub signal: f64,
    pub deployed_at: DateTime<Utc>,
}

/// Kind of decorative map zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayKind {
    Damage,
    Search,
    Connectivity,
    Delivery,
}

impl OverlayKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverlayKind::Damage => "damage",
            OverlayKind::Search => "search",
            OverlayKind::Connectivity => "connectivity",
            OverlayKind::Delivery => "delivery",
        }
    }
}

/// Circular zone drawn on the map for the current phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapOverlay {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: OverlayKind,
    pub coordinates: GeoPosition,
    pub radius: f64,
    pub intensity: f64,
    pub color: String,
    pub phase: MissionPhase,
}

// ============================================================================
// Environment
// ============================================================================

/// Environmental sensor type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorType {
    Temperature,
    Seismic,
    Barometric,
    Rainfall,
    Wind,
    Humidity,
}

impl SensorType {
    /// All sensor types in generation order
    pub const ALL: [SensorType; 6] = [
        SensorType::Temperature,
        SensorType::Seismic,
        SensorType::Barometric,
        SensorType::Rainfall,
        SensorType::Wind,
        SensorType::Humidity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SensorType::Temperature => "temperature",
            SensorType::Seismic => "seismic",
            SensorType::Barometric => "barometric",
            SensorType::Rainfall => "rainfall",
            SensorType::Wind => "wind",
            SensorType::Humidity => "humidity",
        }
    }
}

impl std::fmt::Display for SensorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived status of a sensor reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorStatus {
    Normal,
    Warning,
    Critical,
}

impl SensorStatus {
    pub fn is_abnormal(&self) -> bool {
        *self != SensorStatus::Normal
    }
}

/// Warning/critical threshold pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub warning: f64,
    pub critical: f64,
}

/// Named sensor site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorLocation {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// A single environmental reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: SensorType,
    pub value: f64,
    pub unit: String,
    pub location: SensorLocation,
    pub timestamp: DateTime<Utc>,
    pub status: SensorStatus,
    pub thresholds: Thresholds,
}

/// Predicted disaster type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisasterType {
    Earthquake,
    Landslide,
    Flood,
    Storm,
}

impl DisasterType {
    pub const ALL: [DisasterType; 4] = [
        DisasterType::Earthquake,
        DisasterType::Landslide,
        DisasterType::Flood,
        DisasterType::Storm,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DisasterType::Earthquake => "earthquake",
            DisasterType::Landslide => "landslide",
            DisasterType::Flood => "flood",
            DisasterType::Storm => "storm",
        }
    }
}

impl std::fmt::Display for DisasterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Prediction severity, bucketed from probability
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Moderate,
    High,
    Extreme,
}

impl Severity {
    /// <0.4 low, <0.6 moderate, <0.8 high, else extreme
    pub fn from_probability(probability: f64) -> Self {
        if probability < 0.4 {
            Severity::Low
        } else if probability < 0.6 {
            Severity::Moderate
        } else if probability < 0.8 {
            Severity::High
        } else {
            Severity::Extreme
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Moderate => "moderate",
            Severity::High => "high",
            Severity::Extreme => "extreme",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Area a prediction applies to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionArea {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Radius (meters)
    pub radius: f64,
}

/// Disaster prediction derived from a sensor snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisasterPrediction {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: DisasterType,
    pub probability: f64,
    pub location: PredictionArea,
    pub estimated_time: DateTime<Utc>,
    pub severity: Severity,
    pub description: String,
    pub affected_areas: Vec<String>,
    pub triggered_by: Vec<SensorReading>,
}

impl DisasterPrediction {
    /// High-confidence, high-severity predictions prompt the operator
    pub fn warrants_alert(&self) -> bool {
        self.probability > 0.7 && self.severity >= Severity::High
    }
}

/// Population cluster shown during search and relief
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotspot {
    pub id: String,
    pub location: LatLng,
    pub radius: f64,
    pub people_count: u32,
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// Messaging
// ============================================================================

/// Response body of the SMS endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmsResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SmsResponse {
    /// Locally synthesized failure (transport error, bad status)
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: "Failed to send SMS".to_string(),
            sid: None,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_buckets() {
        assert_eq!(Severity::from_probability(0.1), Severity::Low);
        assert_eq!(Severity::from_probability(0.4), Severity::Moderate);
        assert_eq!(Severity::from_probability(0.59), Severity::Moderate);
        assert_eq!(Severity::from_probability(0.6), Severity::High);
        assert_eq!(Severity::from_probability(0.8), Severity::Extreme);
        assert_eq!(Severity::from_probability(1.0), Severity::Extreme);
    }

    #[test]
    fn test_operations_phase_parse() {
        assert_eq!("relief".parse::<OperationsPhase>(), Ok(OperationsPhase::Relief));
        assert_eq!(" Search ".parse::<OperationsPhase>(), Ok(OperationsPhase::Search));
        assert!("launch".parse::<OperationsPhase>().is_err());
        assert_eq!(OperationsPhase::Monitoring.mission_phase(), None);
        assert_eq!(
            OperationsPhase::from(MissionPhase::Search).mission_phase(),
            Some(MissionPhase::Search)
        );
    }

    #[test]
    fn test_sms_response_wire_format() {
        let ok: SmsResponse =
            serde_json::from_str(r#"{"success":true,"message":"queued","sid":"SM123"}"#).unwrap();
        assert!(ok.success);
        assert_eq!(ok.sid.as_deref(), Some("SM123"));
        assert!(ok.error.is_none());

        let json = serde_json::to_string(&SmsResponse::failure("timeout")).unwrap();
        assert!(json.contains(r#""success":false"#));
        assert!(json.contains(r#""error":"timeout""#));
        assert!(!json.contains("sid"));
    }

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(serde_json::to_string(&DroneStatus::Maintenance).unwrap(), "\"maintenance\"");
        assert_eq!(
            serde_json::to_string(&DroneCategory::NetworkExtender).unwrap(),
            "\"network-extender\""
        );
        assert_eq!(serde_json::to_string(&SensorType::Rainfall).unwrap(), "\"rainfall\"");
    }
}
