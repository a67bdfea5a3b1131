//! Telegrams captured from real meters (identifiers anonymised) with their CRC.

/// Joins the lines with CR/LF and appends the checksum line.
pub fn telegram(lines: &[&str], crc: &str) -> Vec<u8> {
    format!("{}\r\n!{}\r\n", lines.join("\r\n"), crc).into_bytes()
}

/// Same as `telegram`, with the checksum computed for the lines.
pub fn signed_telegram(lines: &[&str]) -> Vec<u8> {
    let body = format!("{}\r\n!", lines.join("\r\n"));
    let crc = super::telegram::calculate_crc(body.as_bytes());
    format!("{}{:04X}\r\n", body, crc).into_bytes()
}

pub const BASIC: &[&str] = &[
    "/XMX5LGBBFFB231215493",
    "",
    "1-0:1.8.1(000441.226*kWh)",
    "1-0:1.8.2(000123.456*kWh)",
];
pub const BASIC_CRC: &str = "6278";

pub const GAS_BASIC: &[&str] = &[
    "/XMX5LGBBFFB231215493",
    "",
    "1-0:1.8.1(000441.226*kWh)",
    "1-0:1.8.2(000123.456*kWh)",
    "0-1:24.2.1(101209112500W)(00012.345*m3)",
];
pub const GAS_BASIC_CRC: &str = "0070";

/// GAS_BASIC once the meter on channel 1 also reports it is a water meter
pub const WATER_UPGRADE: &[&str] = &[
    "/XMX5LGBBFFB231215493",
    "",
    "1-0:1.8.1(000441.226*kWh)",
    "1-0:1.8.2(000123.456*kWh)",
    "0-1:24.1.0(007)",
    "0-1:96.1.0(3232323241424344313233343536373839)",
    "0-1:24.2.1(101209112500W)(00012.345*m3)",
];

/// Channel 3 reports a device type no meter definition accepts
pub const UNKNOWN_DEVICE: &[&str] = &[
    "/XMX5LGBBFFB231215493",
    "",
    "1-0:1.8.1(000441.226*kWh)",
    "1-0:1.8.2(000123.456*kWh)",
    "0-3:24.1.0(099)",
    "0-3:24.2.1(101209112500W)(00012.345*m3)",
];

pub const MULTI: &[&str] = &[
    "/XMX5LGBBFFB231215493",
    "",
    "1-0:1.8.1(000441.226*kWh)",
    "1-0:1.8.2(000123.456*kWh)",
    "0-1:24.1.0(003)",
    "0-1:96.1.0(3232323241424344313233343536373839)",
    "0-1:24.2.1(101209112500W)(12785.123*m3)",
    "0-2:24.1.0(007)",
    "0-2:96.1.0(3333333341424344313233343536373839)",
    "0-2:24.2.1(101209112500W)(00321.500*m3)",
];
pub const MULTI_CRC: &str = "FE64";

pub const BAD_VALUE: &[&str] = &[
    "/XMX5LGBBFFB231215493",
    "",
    "1-0:1.8.1(000441.226*kWh)",
    "1-0:1.8.2(000123.456*kWh)",
    "1-0:1.7.0(00.318*kW)",
    "1-0:2.7.0(banana*kW)",
    "1-0:32.7.0(230.1*kWh)",
    "0-0:96.99.0(hello)",
];
pub const BAD_VALUE_CRC: &str = "E8BF";

pub const DSMR_V5: &[&str] = &[
    r"/ISk5\2MT382-1000",
    "",
    "1-3:0.2.8(50)",
    "0-0:1.0.0(101209113020W)",
    "0-0:96.1.1(4B384547303034303436333935353037)",
    "1-0:1.8.1(123456.789*kWh)",
    "1-0:1.8.2(123456.789*kWh)",
    "1-0:2.8.1(123456.789*kWh)",
    "1-0:2.8.2(123456.789*kWh)",
    "0-0:96.14.0(0002)",
    "1-0:1.7.0(01.193*kW)",
    "1-0:2.7.0(00.000*kW)",
    "0-0:96.7.21(00004)",
    "0-0:96.7.9(00002)",
    "1-0:99.97.0(2)(0-0:96.7.19)(101208152415W)(0000000240*s)(101208151004W)(0000000301*s)",
    "1-0:32.32.0(00002)",
    "1-0:52.32.0(00001)",
    "1-0:72.32.0(00000)",
    "1-0:32.36.0(00000)",
    "1-0:52.36.0(00003)",
    "1-0:72.36.0(00000)",
    "0-0:96.13.0(303132333435363738393A3B3C3D3E3F303132333435363738393A3B3C3D3E3F303132333435363738393A3B3C3D3E3F303132333435363738393A3B3C3D3E3F303132333435363738393A3B3C3D3E3F)",
    "1-0:32.7.0(220.1*V)",
    "1-0:52.7.0(220.2*V)",
    "1-0:72.7.0(220.3*V)",
    "1-0:31.7.0(001*A)",
    "1-0:51.7.0(002*A)",
    "1-0:71.7.0(003*A)",
    "1-0:21.7.0(01.111*kW)",
    "1-0:41.7.0(02.222*kW)",
    "1-0:61.7.0(03.333*kW)",
    "1-0:22.7.0(04.444*kW)",
    "1-0:42.7.0(05.555*kW)",
    "1-0:62.7.0(06.666*kW)",
    "0-1:24.1.0(003)",
    "0-1:96.1.0(3232323241424344313233343536373839)",
    "0-1:24.2.1(101209112500W)(12785.123*m3)",
];
pub const DSMR_V5_CRC: &str = "E47C";

pub const DSMR_V3: &[&str] = &[
    r"/ISk5\2MT382-1000",
    "",
    "0-0:96.1.1(4B414C37303035303739393336333132)",
    "1-0:1.8.1(00154.000*kWh)",
    "1-0:1.8.2(00135.000*kWh)",
    "1-0:2.8.1(00000.000*kWh)",
    "1-0:2.8.2(00000.000*kWh)",
    "0-0:96.14.0(0002)",
    "1-0:1.7.0(0000.37*kW)",
    "1-0:2.7.0(0000.00*kW)",
    "0-0:17.0.0(0999.00*kW)",
    "0-0:96.3.10(1)",
    "0-0:96.13.1()",
    "0-0:96.13.0()",
    "0-1:24.1.0(3)",
    "0-1:96.1.0(3238303131303031333132303434363135)",
    "0-1:24.3.0(121030140000)(00)(60)(1)(0-1:24.2.1)(m3)",
    "(00000.000)",
    "0-1:24.4.0(1)",
];
pub const DSMR_V3_CRC: &str = "E7AD";

pub const EMUCS: &[&str] = &[
    r"/FLU5\253769484_A",
    "",
    "0-0:96.1.4(50217)",
    "0-0:96.1.1(3153414123456789303139393739)",
    "0-0:1.0.0(200512135409S)",
    "1-0:1.8.1(000000.034*kWh)",
    "1-0:1.8.2(000015.758*kWh)",
    "1-0:2.8.1(000000.000*kWh)",
    "1-0:2.8.2(000000.011*kWh)",
    "1-0:1.4.0(02.351*kW)",
    "1-0:1.6.0(200509134558S)(02.589*kW)",
    "0-0:96.14.0(0001)",
    "1-0:1.7.0(00.000*kW)",
    "1-0:2.7.0(00.000*kW)",
    "1-0:32.7.0(234.7*V)",
    "1-0:31.7.0(000.00*A)",
    "0-0:96.3.10(1)",
    "0-0:17.0.0(999.9*kW)",
    "1-0:31.4.0(999*A)",
    "0-0:96.13.0()",
    "0-1:24.1.0(003)",
    "0-1:96.1.1(37464C4F32313139303137303532)",
    "0-1:24.4.0(1)",
    "0-1:24.2.3(200512134558S)(00112.384*m3)",
];
pub const EMUCS_CRC: &str = "5DEC";
