/// Byte order marks, longest first so `FF FE 00 00` is not read as UTF-16LE.
const BOMS: &[(&[u8], &str)] = &[
    (&[0x00, 0x00, 0xFE, 0xFF], "utf-32be"),
    (&[0xFF, 0xFE, 0x00, 0x00], "utf-32le"),
    (&[0xEF, 0xBB, 0xBF], "utf-8-sig"),
    (&[0xFE, 0xFF], "utf-16be"),
    (&[0xFF, 0xFE], "utf-16le"),
];

/// Label of the byte order mark the sample starts with, if any.
pub(crate) fn sniff(sample: &[u8]) -> Option<&'static str> {
    BOMS.iter()
        .find(|(bom, _)| sample.starts_with(bom))
        .map(|(_, label)| *label)
}
