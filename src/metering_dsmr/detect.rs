use std::collections::{BTreeMap, BTreeSet, HashSet};
use log::{debug, error, info};
use crate::obis_utils::ObisCode;
use super::cosem_catalog::MBUS_DEVICE_TYPE;
use super::meter_definitions::METER_TYPES;
use super::structs::{CosemObject, MeterDescriptor, MeterKind, MeterTypeDefinition};
use super::DsmrError;

/// Outcome of one detection run
#[derive(Debug, Default)]
pub struct DetectionReport {
    /// Confirmed meters, ordered by channel
    pub meters: Vec<MeterDescriptor>,
    /// Present channels no definition matched
    pub undetected_channels: Vec<u8>,
    /// `DsmrError::AmbiguousKind` for every channel that could not be resolved
    pub conflicts: Vec<DsmrError>,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    definition: &'static MeterTypeDefinition,
    score: usize,
}

impl Candidate {
    fn rank(&self) -> (usize, usize) {
        (self.score, self.definition.total_len())
    }
}

/// Finds the meter types that explain the objects of a telegram
pub struct MeterDetector {
    definitions: &'static [&'static MeterTypeDefinition],
}

impl Default for MeterDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl MeterDetector {
    pub fn new() -> Self {
        Self { definitions: METER_TYPES }
    }

    pub fn with_definitions(definitions: &'static [&'static MeterTypeDefinition]) -> Self {
        Self { definitions }
    }

    pub fn detect(&self, objects: &[CosemObject], channels: &BTreeSet<u8>) -> DetectionReport {
        /* Unknown objects never drive discovery */
        let present: HashSet<ObisCode> = objects.iter()
            .filter(|o| o.is_known())
            .map(|o| o.obis.canonical())
            .collect();

        let mut report = DetectionReport::default();

        for &channel in channels {
            let device_type = reported_device_type(objects, channel);

            let mut by_kind: BTreeMap<MeterKind, Vec<Candidate>> = BTreeMap::new();
            for definition in self.definitions.iter().copied().filter(|d| d.kind.is_plausible_on(channel)) {
                if let Some(candidate) = score(definition, channel, &present, device_type) {
                    debug!("Channel {} matches {} with score {}", channel, definition.name, candidate.score);
                    by_kind.entry(definition.kind).or_default().push(candidate);
                }
            }

            if by_kind.is_empty() {
                report.undetected_channels.push(channel);
                continue;
            }

            if by_kind.len() > 1 {
                /* Two kinds on one channel means overlapping definitions */
                let candidates = by_kind.values()
                    .flatten()
                    .map(|c| c.definition.name.to_string())
                    .collect();
                report.conflicts.push(DsmrError::AmbiguousKind { channel, candidates });
                continue;
            }

            for group in by_kind.values() {
                match pick_winner(group) {
                    Ok(winner) => report.meters.push(MeterDescriptor::new(winner, channel)),
                    Err(candidates) => report.conflicts.push(DsmrError::AmbiguousKind { channel, candidates }),
                }
            }
        }

        report.meters.sort();
        report
    }
}

/// Number of required objects present, `None` when one is missing or the
/// channel reports a device type the definition does not accept.
fn score(definition: &'static MeterTypeDefinition, channel: u8, present: &HashSet<ObisCode>, device_type: Option<i64>) -> Option<Candidate> {
    if let Some(device_type) = device_type {
        if !definition.device_types.is_empty() && !definition.accepts_device_type(device_type) {
            return None;
        }
    }

    let all_present = definition.required.iter()
        .all(|id| present.contains(&id.instantiate(channel).canonical()));
    if !all_present {
        return None;
    }

    Some(Candidate { definition, score: definition.required.len() })
}

/// Highest score wins, the larger definition breaks ties.
/// Returns the tied names if that still leaves more than one.
fn pick_winner(group: &[Candidate]) -> Result<&'static MeterTypeDefinition, Vec<String>> {
    let best = group.iter()
        .map(Candidate::rank)
        .max()
        .ok_or_else(Vec::new)?;

    let winners: Vec<&Candidate> = group.iter().filter(|c| c.rank() == best).collect();
    match winners.as_slice() {
        [winner] => Ok(winner.definition),
        tied => Err(tied.iter().map(|c| c.definition.name.to_string()).collect()),
    }
}

fn reported_device_type(objects: &[CosemObject], channel: u8) -> Option<i64> {
    objects.iter()
        .filter(|o| o.obis.channel() == Some(channel))
        .find(|o| MBUS_DEVICE_TYPE.matches(&o.obis))
        .and_then(|o| o.value.as_integer())
}

/// Channel 0 plus every M-Bus channel that sent a known object
pub fn telegram_channels(objects: &[CosemObject]) -> BTreeSet<u8> {
    let mut channels = BTreeSet::from([0]);
    channels.extend(objects.iter()
        .filter(|o| o.object_type.is_some_and(|t| t.id.is_template()))
        .filter_map(|o| o.obis.channel())
        .filter(|c| *c >= 1));
    channels
}

/// Detects the meters on `channels` with the built in meter types.
/// Conflicts are logged, they point at overlapping meter definitions.
pub fn discover(objects: &[CosemObject], channels: &BTreeSet<u8>) -> Vec<MeterDescriptor> {
    let report = MeterDetector::new().detect(objects, channels);

    for conflict in &report.conflicts {
        error!("Meter detection conflict: {}", conflict);
    }
    if !report.undetected_channels.is_empty() {
        info!("No meter detected on channel(s) {:?}", report.undetected_channels);
    }
    for meter in &report.meters {
        debug!("Detected {}", meter);
    }

    report.meters
}
