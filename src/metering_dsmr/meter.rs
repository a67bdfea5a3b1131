use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use log::{debug, error, info};
use serde_json::{Map, Value};
use crate::obis_utils::ObisCode;
use super::structs::{CosemObject, MeterDescriptor, MeterKind};
use super::DsmrError;

/// Receives every object a runtime meter accepts
pub trait MeterListener: Send + Sync {
    fn measurement_received(&self, object: &CosemObject);
}

/// A confirmed meter, forwards the objects of its channel to a listener
pub struct RuntimeMeter {
    descriptor: MeterDescriptor,
    supported: HashSet<ObisCode>,
    listener: Arc<dyn MeterListener>,
}

impl RuntimeMeter {
    pub fn new(descriptor: MeterDescriptor, listener: Arc<dyn MeterListener>) -> Self {
        let supported = descriptor.meter_type.identifiers()
            .map(|id| id.instantiate(descriptor.channel).canonical())
            .collect();
        RuntimeMeter { descriptor, supported, listener }
    }

    pub fn descriptor(&self) -> MeterDescriptor {
        self.descriptor
    }

    pub fn supports(&self, code: &ObisCode) -> bool {
        self.supported.contains(&code.canonical())
    }

    pub fn supported_identifiers(&self) -> impl Iterator<Item = &ObisCode> {
        self.supported.iter()
    }

    /// Hands every supported object to the listener, in telegram order,
    /// and returns the objects that were accepted.
    pub fn handle(&self, objects: &[CosemObject]) -> Vec<CosemObject> {
        let accepted: Vec<CosemObject> = objects.iter()
            .filter(|o| self.supports(&o.obis))
            .cloned()
            .collect();

        for object in &accepted {
            self.listener.measurement_received(object);
        }
        accepted
    }
}

impl PartialEq for RuntimeMeter {
    fn eq(&self, other: &Self) -> bool {
        self.descriptor == other.descriptor
    }
}

impl Eq for RuntimeMeter {}

impl fmt::Debug for RuntimeMeter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeMeter")
            .field("descriptor", &self.descriptor.to_string())
            .field("supported", &self.supported.len())
            .finish()
    }
}

/// What a discovery run changed in the registry
#[derive(Debug, Default, PartialEq)]
pub struct RegistryChanges {
    pub added: Vec<MeterDescriptor>,
    /// (previous, new) pairs on the same channel
    pub replaced: Vec<(MeterDescriptor, MeterDescriptor)>,
    pub unchanged: Vec<MeterDescriptor>,
    /// Meters of another kind rejected because their channel is taken
    pub conflicts: Vec<DsmrError>,
}

impl RegistryChanges {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.replaced.is_empty()
    }
}

fn specificity(descriptor: &MeterDescriptor) -> (usize, usize) {
    (descriptor.meter_type.required.len(), descriptor.meter_type.total_len())
}

/// The confirmed meters, at most one per channel.
///
/// Discovery takes the write lock, dispatching a telegram only the read lock.
#[derive(Default)]
pub struct MeterRegistry {
    meters: RwLock<HashMap<MeterDescriptor, Arc<RuntimeMeter>>>,
}

impl MeterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<MeterDescriptor, Arc<RuntimeMeter>>> {
        self.meters.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<MeterDescriptor, Arc<RuntimeMeter>>> {
        self.meters.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds the discovered meters, at most one per channel. A meter already
    /// present on the channel is only replaced by a more specific definition.
    /// A less specific meter of another kind is reported as a conflict and
    /// the existing meter stays.
    pub fn apply_discovery<F>(&self, descriptors: &[MeterDescriptor], mut listener_for: F) -> RegistryChanges
    where
        F: FnMut(&MeterDescriptor) -> Arc<dyn MeterListener>,
    {
        let mut meters = self.write();
        let mut changes = RegistryChanges::default();

        for descriptor in descriptors {
            if meters.contains_key(descriptor) {
                changes.unchanged.push(*descriptor);
                continue;
            }

            let existing = meters.keys()
                .find(|d| d.channel == descriptor.channel)
                .copied();

            match existing {
                Some(current) if specificity(&current) >= specificity(descriptor) => {
                    if current.kind() == descriptor.kind() {
                        debug!("Keeping {} instead of less specific {}", current, descriptor);
                    } else {
                        let conflict = DsmrError::AmbiguousKind {
                            channel: descriptor.channel,
                            candidates: vec![current.to_string(), descriptor.to_string()],
                        };
                        error!("Keeping {}: {}", current, conflict);
                        changes.conflicts.push(conflict);
                    }
                    changes.unchanged.push(current);
                }
                Some(current) => {
                    info!("Replacing meter {} with {}", current, descriptor);
                    meters.remove(&current);
                    meters.insert(*descriptor, Arc::new(RuntimeMeter::new(*descriptor, listener_for(descriptor))));
                    changes.replaced.push((current, *descriptor));
                }
                None => {
                    info!("Adding meter {}", descriptor);
                    meters.insert(*descriptor, Arc::new(RuntimeMeter::new(*descriptor, listener_for(descriptor))));
                    changes.added.push(*descriptor);
                }
            }
        }

        changes
    }

    /// Drops all meters on channels that are no longer present
    pub fn retain_channels(&self, channels: &BTreeSet<u8>) -> Vec<MeterDescriptor> {
        let mut meters = self.write();
        let removed: Vec<MeterDescriptor> = meters.keys()
            .filter(|d| !channels.contains(&d.channel))
            .copied()
            .collect();

        for descriptor in &removed {
            info!("Removing meter {}", descriptor);
            meters.remove(descriptor);
        }
        removed
    }

    pub fn remove(&self, descriptor: &MeterDescriptor) -> Option<Arc<RuntimeMeter>> {
        self.write().remove(descriptor)
    }

    pub fn get(&self, kind: MeterKind, channel: u8) -> Option<Arc<RuntimeMeter>> {
        self.read().iter()
            .find(|(d, _)| d.kind() == kind && d.channel == channel)
            .map(|(_, m)| m.clone())
    }

    /// Hands the objects to every meter, returns how many objects were accepted
    pub fn dispatch(&self, objects: &[CosemObject]) -> usize {
        let meters = self.read();
        let mut descriptors: Vec<&MeterDescriptor> = meters.keys().collect();
        descriptors.sort();

        descriptors.into_iter()
            .filter_map(|d| meters.get(d))
            .map(|meter| meter.handle(objects).len())
            .sum()
    }

    pub fn descriptors(&self) -> Vec<MeterDescriptor> {
        let mut descriptors: Vec<MeterDescriptor> = self.read().keys().copied().collect();
        descriptors.sort();
        descriptors
    }

    /// True if any registered meter accepts `code`
    pub fn is_supported(&self, code: &ObisCode) -> bool {
        self.read().values().any(|m| m.supports(code))
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

/// Listener collecting the values of one meter until the telegram is done
#[derive(Debug)]
pub struct MeteringCollector {
    descriptor: MeterDescriptor,
    values: Mutex<Map<String, Value>>,
}

impl MeteringCollector {
    pub fn new(descriptor: MeterDescriptor) -> Self {
        MeteringCollector { descriptor, values: Mutex::new(Map::new()) }
    }

    pub fn descriptor(&self) -> MeterDescriptor {
        self.descriptor
    }

    /// Returns the collected values and starts over, `None` if nothing arrived
    pub fn take_values(&self) -> Option<Map<String, Value>> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        if values.is_empty() {
            return None;
        }
        Some(std::mem::take(&mut *values))
    }
}

impl MeterListener for MeteringCollector {
    fn measurement_received(&self, object: &CosemObject) {
        let name = object.name();
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);

        values.insert(name.clone(), object.value.to_json());
        if let Some(unit) = object.value.unit() {
            values.insert(format!("{}_unit", name), unit.into());
        }
        if let Some(at) = object.value.captured_at() {
            values.insert(format!("{}_time", name), at.to_rfc3339().into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metering_dsmr::cosem_parser::parse_cosem_objects;
    use crate::metering_dsmr::meter_definitions::{ELECTRICITY_BASIC, ELECTRICITY_V5_0, GAS_BASIC, GAS_V4_V5, HEAT_V4_V5, WATER_V4_V5};
    use crate::metering_dsmr::structs::MeterTypeDefinition;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<String>>,
    }

    impl MeterListener for Recorder {
        fn measurement_received(&self, object: &CosemObject) {
            self.seen.lock().unwrap().push(object.obis.to_string());
        }
    }

    fn descriptor(meter_type: &'static MeterTypeDefinition, channel: u8) -> MeterDescriptor {
        MeterDescriptor::new(meter_type, channel)
    }

    const MIXED_CHANNELS: &[&str] = &[
        "0-1:24.1.0(003)",
        "0-2:24.1.0(007)",
        "0-2:96.1.0(3333333341424344313233343536373839)",
        "0-1:96.1.0(3232323241424344313233343536373839)",
        "0-2:24.2.1(101209112500W)(00321.500*m3)",
        "1-0:1.8.1(000441.226*kWh)",
        "0-1:24.2.1(101209112500W)(12785.123*m3)",
    ];

    #[test]
    fn test_meter_only_forwards_its_channel() {
        let (objects, errors) = parse_cosem_objects(MIXED_CHANNELS);
        assert!(errors.is_empty());

        let recorder = Arc::new(Recorder::default());
        let meter = RuntimeMeter::new(descriptor(&GAS_V4_V5, 1), recorder.clone());
        let accepted = meter.handle(&objects);

        let expected = vec!["0-1:24.1.0", "0-1:96.1.0", "0-1:24.2.1"];
        assert_eq!(*recorder.seen.lock().unwrap(), expected);
        let accepted: Vec<String> = accepted.iter().map(|o| o.obis.to_string()).collect();
        assert_eq!(accepted, expected);
    }

    #[test]
    fn test_supported_identifiers_are_instantiated() {
        let meter = RuntimeMeter::new(descriptor(&GAS_V4_V5, 3), Arc::new(Recorder::default()));
        assert_eq!(meter.supported_identifiers().count(), GAS_V4_V5.total_len());
        assert!(meter.supported_identifiers().all(|c| c.channel() == Some(3)));
        assert!(meter.supports(&ObisCode::new(0, 3, 24, 2, 1)));
        assert!(!meter.supports(&ObisCode::new(0, 1, 24, 2, 1)));
    }

    #[test]
    fn test_meters_compare_by_descriptor() {
        let a = RuntimeMeter::new(descriptor(&GAS_V4_V5, 1), Arc::new(Recorder::default()));
        let b = RuntimeMeter::new(descriptor(&GAS_V4_V5, 1), Arc::new(Recorder::default()));
        let c = RuntimeMeter::new(descriptor(&GAS_V4_V5, 2), Arc::new(Recorder::default()));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    fn recorder_for(_: &MeterDescriptor) -> Arc<dyn MeterListener> {
        Arc::new(Recorder::default())
    }

    #[test]
    fn test_registry_applies_discovery_once() {
        let registry = MeterRegistry::new();
        let found = vec![descriptor(&ELECTRICITY_BASIC, 0), descriptor(&GAS_V4_V5, 1)];

        let first = registry.apply_discovery(&found, recorder_for);
        assert_eq!(first.added, found);
        assert!(!first.is_empty());

        let second = registry.apply_discovery(&found, recorder_for);
        assert!(second.is_empty());
        assert_eq!(second.unchanged, found);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_registry_only_upgrades_to_more_specific_meters() {
        let registry = MeterRegistry::new();
        registry.apply_discovery(&[descriptor(&ELECTRICITY_BASIC, 0)], recorder_for);

        let upgrade = registry.apply_discovery(&[descriptor(&ELECTRICITY_V5_0, 0)], recorder_for);
        assert_eq!(upgrade.replaced, vec![(descriptor(&ELECTRICITY_BASIC, 0), descriptor(&ELECTRICITY_V5_0, 0))]);

        let downgrade = registry.apply_discovery(&[descriptor(&ELECTRICITY_BASIC, 0)], recorder_for);
        assert!(downgrade.is_empty());
        assert_eq!(registry.descriptors(), vec![descriptor(&ELECTRICITY_V5_0, 0)]);
        assert!(registry.get(MeterKind::MainElectricity, 0).is_some());
    }

    #[test]
    fn test_registry_keeps_kinds_apart() {
        let registry = MeterRegistry::new();
        registry.apply_discovery(&[descriptor(&GAS_V4_V5, 1), descriptor(&WATER_V4_V5, 2)], recorder_for);
        assert_eq!(registry.len(), 2);

        let removed = registry.retain_channels(&BTreeSet::from([0, 1]));
        assert_eq!(removed, vec![descriptor(&WATER_V4_V5, 2)]);
        assert_eq!(registry.descriptors(), vec![descriptor(&GAS_V4_V5, 1)]);
        assert!(registry.remove(&descriptor(&GAS_V4_V5, 1)).is_some());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_registry_holds_one_kind_per_channel() {
        let registry = MeterRegistry::new();
        registry.apply_discovery(&[descriptor(&GAS_BASIC, 1)], recorder_for);

        let water = registry.apply_discovery(&[descriptor(&WATER_V4_V5, 1)], recorder_for);
        assert_eq!(water.replaced, vec![(descriptor(&GAS_BASIC, 1), descriptor(&WATER_V4_V5, 1))]);
        assert!(water.conflicts.is_empty());
        assert_eq!(registry.descriptors(), vec![descriptor(&WATER_V4_V5, 1)]);

        let heat = registry.apply_discovery(&[descriptor(&HEAT_V4_V5, 1)], recorder_for);
        assert!(heat.is_empty());
        assert_eq!(heat.unchanged, vec![descriptor(&WATER_V4_V5, 1)]);
        assert!(matches!(heat.conflicts.as_slice(), [DsmrError::AmbiguousKind { channel: 1, .. }]));
        assert_eq!(registry.descriptors(), vec![descriptor(&WATER_V4_V5, 1)]);
        assert!(registry.get(MeterKind::Heat, 1).is_none());
    }

    #[test]
    fn test_registry_dispatch() {
        let (objects, _) = parse_cosem_objects(MIXED_CHANNELS);
        let registry = MeterRegistry::new();
        registry.apply_discovery(&[descriptor(&GAS_V4_V5, 1), descriptor(&WATER_V4_V5, 2)], recorder_for);

        assert_eq!(registry.dispatch(&objects), 6);
        assert!(registry.is_supported(&ObisCode::new(0, 2, 24, 2, 1)));
        assert!(!registry.is_supported(&ObisCode::new(1, 0, 1, 8, 1)));
    }

    #[test]
    fn test_descriptor_serial() {
        let (objects, _) = parse_cosem_objects(MIXED_CHANNELS);
        assert_eq!(descriptor(&GAS_V4_V5, 1).serial(&objects).as_deref(), Some("2222ABCD123456789"));
        assert_eq!(descriptor(&WATER_V4_V5, 2).serial(&objects).as_deref(), Some("3333ABCD123456789"));
        assert_eq!(descriptor(&GAS_V4_V5, 3).serial(&objects), None);
        assert_eq!(descriptor(&GAS_BASIC, 1).serial(&objects), None);
    }

    #[test]
    fn test_collector_gathers_values() {
        let (objects, _) = parse_cosem_objects(MIXED_CHANNELS);
        let collector = Arc::new(MeteringCollector::new(descriptor(&GAS_V4_V5, 1)));
        let meter = RuntimeMeter::new(collector.descriptor(), collector.clone());
        meter.handle(&objects);

        let values = collector.take_values().unwrap();
        assert_eq!(values["reading"], serde_json::json!(12785.123));
        assert_eq!(values["reading_unit"], "m3");
        assert_eq!(values["reading_time"], "2010-12-09T11:25:00+01:00");
        assert_eq!(values["device_type"], 3);
        assert_eq!(values["equipment_identifier"], "2222ABCD123456789");

        assert!(collector.take_values().is_none());
    }
}
