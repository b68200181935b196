/// Map of the console's hue/value output to RGB values.
///
/// Indexed by the 6-bit colour stored in palette RAM.
/// ```
/// assert_eq!(famicore::HV_TO_RGB[0x0F], [0, 0, 0]);
/// assert_eq!(famicore::HV_TO_RGB.len(), 64);
/// ```
pub const HV_TO_RGB: [[u8; 3]; 64] = [
    [84, 84, 84],
    [0, 30, 116],
    [8, 16, 144],
    [48, 0, 136],
    [68, 0, 100],
    [92, 0, 48],
    [84, 4, 0],
    [60, 24, 0],
    [32, 42, 0],
    [8, 58, 0],
    [0, 64, 0],
    [0, 60, 0],
    [0, 50, 60],
    [0, 0, 0],
    [0, 0, 0],
    [0, 0, 0],
    [152, 150, 152],
    [8, 76, 196],
    [48, 50, 236],
    [92, 30, 228],
    [136, 20, 176],
    [160, 20, 100],
    [152, 34, 32],
    [120, 60, 0],
    [84, 90, 0],
    [40, 114, 0],
    [8, 124, 0],
    [0, 118, 40],
    [0, 102, 120],
    [0, 0, 0],
    [0, 0, 0],
    [0, 0, 0],
    [236, 238, 236],
    [76, 154, 236],
    [120, 124, 236],
    [176, 98, 236],
    [228, 84, 236],
    [236, 88, 180],
    [236, 106, 100],
    [212, 136, 32],
    [160, 170, 0],
    [116, 196, 0],
    [76, 208, 32],
    [56, 204, 108],
    [56, 180, 204],
    [60, 60, 60],
    [0, 0, 0],
    [0, 0, 0],
    [236, 238, 236],
    [168, 204, 236],
    [188, 188, 236],
    [212, 178, 236],
    [236, 174, 236],
    [236, 174, 212],
    [236, 180, 176],
    [228, 196, 144],
    [204, 210, 120],
    [180, 222, 120],
    [168, 226, 144],
    [152, 226, 180],
    [160, 214, 228],
    [160, 162, 160],
    [0, 0, 0],
    [0, 0, 0],
];

/// The debug palette, used instead of the palette ram if [Settings::use_debug_palette][crate::Settings::use_debug_palette] is `true`.
pub const DEBUG_PALETTE: [u8; 32] = [
    0x1D, 0x01, 0x11, 0x21, 0x1D, 0x05, 0x15, 0x25, 0x1D, 0x09, 0x19, 0x29, 0x1D, 0x06, 0x16, 0x26,
    0x1D, 0x13, 0x23, 0x33, 0x1D, 0x17, 0x27, 0x37, 0x1D, 0x1B, 0x2B, 0x3B, 0x1D, 0x18, 0x28, 0x38,
];

// Attenuation applied to the non-emphasised channels when any emphasis bit is set
const EMPHASIS_ATTENUATION: f32 = 0.816;

/// Convert a palette RAM value to RGB, applying the PPUMASK emphasis bits.
///
/// `emphasis` is the top 3 bits of PPUMASK shifted down (bit 0 = red, 1 = green, 2 = blue).
pub fn to_rgb(hv: u8, emphasis: u8) -> [u8; 3] {
    let rgb = HV_TO_RGB[(hv & 0x3F) as usize];
    if emphasis == 0 {
        return rgb;
    }
    let mut out = [0; 3];
    (0..3).for_each(|channel| {
        out[channel] = if emphasis & (1 << channel) != 0 {
            rgb[channel]
        } else {
            (rgb[channel] as f32 * EMPHASIS_ATTENUATION) as u8
        };
    });
    out
}
