use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use crate::obis_utils::ObisCode;
use super::cosem_catalog;
use super::structs::{CosemObject, CosemValue};
use super::values::decode_value;
use super::DsmrError;

lazy_static! {
    /// One or more `(...)` groups and nothing else
    static ref VALUE_GROUPS: Regex = Regex::new(r"^(\([^()]*\))+$").unwrap();
    static ref VALUE: Regex = Regex::new(r"\(([^()]*)\)").unwrap();
}

/// Parses a data line like `1-0:1.8.1(000441.226*kWh)`.
///
/// Lines with an OBIS code missing from the catalog are kept with their raw
/// values so they can still be forwarded.
pub fn parse_cosem_line(line: &str) -> Result<CosemObject, DsmrError> {
    let line = line.trim();
    let open = line.find('(').ok_or(DsmrError::InvalidDataLine)?;
    let (code, values) = line.split_at(open);

    let obis: ObisCode = code.parse()?;

    if !VALUE_GROUPS.is_match(values) {
        return Err(DsmrError::InvalidDataLine);
    }

    let raw_values: Vec<String> = VALUE.captures_iter(values)
        .map(|c| c[1].to_string())
        .collect();

    let object_type = cosem_catalog::lookup(&obis);
    let value = match object_type {
        Some(t) => decode_value(t, &raw_values).map_err(|reason| DsmrError::ValueDecode {
            obis: obis.to_string(),
            reason,
        })?,
        None => {
            debug!("OBIS code {} is not in the catalog", obis);
            CosemValue::Raw(raw_values.clone())
        }
    };

    Ok(CosemObject { obis, object_type, raw_values, value })
}

/// Parses all content lines, keeping the order of the telegram.
/// Failing lines are collected instead of aborting the telegram.
pub fn parse_cosem_objects<S: AsRef<str>>(lines: &[S]) -> (Vec<CosemObject>, Vec<DsmrError>) {
    let mut objects = Vec::with_capacity(lines.len());
    let mut errors = Vec::new();

    for line in lines {
        match parse_cosem_line(line.as_ref()) {
            Ok(object) => objects.push(object),
            Err(e) => errors.push(e),
        }
    }

    (objects, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metering_dsmr::cosem_catalog::*;
    use crate::metering_dsmr::telegram::decode;
    use crate::metering_dsmr::test_telegrams::*;

    #[test]
    fn test_parse_energy_line() {
        let object = parse_cosem_line("1-0:1.8.1(000441.226*kWh)").unwrap();
        assert_eq!(object.obis, ObisCode::new(1, 0, 1, 8, 1));
        assert_eq!(object.name(), "energy_delivered_t1");
        assert_eq!(object.value.as_decimal(), Some(441.226));
        assert_eq!(object.value.unit(), Some("kWh"));
        assert_eq!(object.raw_values, vec!["000441.226*kWh"]);
    }

    #[test]
    fn test_parse_mbus_line_resolves_channel() {
        let object = parse_cosem_line("0-2:24.2.1(101209112500W)(00321.500*m3)").unwrap();
        assert_eq!(object.obis.channel(), Some(2));
        assert_eq!(object.object_type.unwrap().id, MBUS_READING);
        assert_eq!(object.value.as_decimal(), Some(321.5));
    }

    #[test]
    fn test_unknown_code_is_kept_raw() {
        let object = parse_cosem_line("0-0:96.99.0(hello)(world)").unwrap();
        assert!(!object.is_known());
        assert_eq!(object.name(), "0-0:96.99.0");
        assert_eq!(object.value, CosemValue::Raw(vec!["hello".to_string(), "world".to_string()]));
    }

    #[test]
    fn test_empty_value_group() {
        let object = parse_cosem_line("0-0:96.13.0()").unwrap();
        assert_eq!(object.value, CosemValue::Text(String::new()));
    }

    #[test]
    fn test_invalid_lines() {
        assert!(matches!(parse_cosem_line("1-0:1.8.1"), Err(DsmrError::InvalidDataLine)));
        assert!(matches!(parse_cosem_line("1-0:1.8.1(12*kWh"), Err(DsmrError::InvalidDataLine)));
        assert!(matches!(parse_cosem_line("1-0:1.8.1(12*kWh)x"), Err(DsmrError::InvalidDataLine)));
        assert!(matches!(parse_cosem_line("1-0:1.x.1(12*kWh)"), Err(DsmrError::InvalidObisCode(_))));
    }

    #[test]
    fn test_value_errors_name_the_code() {
        match parse_cosem_line("1-0:2.7.0(banana*kW)") {
            Err(DsmrError::ValueDecode { obis, .. }) => assert_eq!(obis, "1-0:2.7.0"),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_bad_lines_do_not_spoil_the_telegram() {
        let telegram = decode(&telegram(BAD_VALUE, BAD_VALUE_CRC)).unwrap();
        let names: Vec<String> = telegram.objects.iter().map(|o| o.name()).collect();
        assert_eq!(names, vec!["energy_delivered_t1", "energy_delivered_t2", "power_delivered", "0-0:96.99.0"]);
        // banana and the voltage reported in kWh
        assert_eq!(telegram.line_errors.len(), 2);
        assert!(telegram.line_errors.iter().all(|e| matches!(e, DsmrError::ValueDecode { .. })));
    }

    #[test]
    fn test_decode_dsmr5_telegram() {
        let telegram = decode(&telegram(DSMR_V5, DSMR_V5_CRC)).unwrap();
        assert!(telegram.line_errors.is_empty(), "{:?}", telegram.line_errors);
        assert_eq!(telegram.objects.len(), DSMR_V5.len() - 2);
        assert!(telegram.objects.iter().all(|o| o.is_known()));

        let text = telegram.objects.iter().find(|o| o.obis == ObisCode::new(0, 0, 96, 1, 1)).unwrap();
        assert_eq!(text.value, CosemValue::Text("K8EG004046395507".to_string()));

        let failures = telegram.objects.iter().find(|o| o.obis == ObisCode::new(1, 0, 99, 97, 0)).unwrap();
        assert!(matches!(&failures.value, CosemValue::EventLog(events) if events.len() == 2));
    }

    #[test]
    fn test_decode_dsmr3_profile_reading() {
        let telegram = decode(&telegram(DSMR_V3, DSMR_V3_CRC)).unwrap();
        assert!(telegram.line_errors.is_empty(), "{:?}", telegram.line_errors);
        let reading = telegram.objects.iter().find(|o| o.obis == ObisCode::new(0, 1, 24, 3, 0)).unwrap();
        assert_eq!(reading.value.as_decimal(), Some(0.0));
        assert_eq!(reading.value.unit(), Some("m3"));
    }

    #[test]
    fn test_decode_emucs_telegram() {
        let telegram = decode(&telegram(EMUCS, EMUCS_CRC)).unwrap();
        assert!(telegram.line_errors.is_empty(), "{:?}", telegram.line_errors);
        assert_eq!(telegram.header.manufacturer, "FLU");
        let demand = telegram.objects.iter().find(|o| o.obis == ObisCode::new(1, 0, 1, 6, 0)).unwrap();
        assert_eq!(demand.value.as_decimal(), Some(2.589));
    }
}
