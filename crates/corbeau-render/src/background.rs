// SPDX-License-Identifier: CEPL-1.0
//! The static background image baked into the binary.
//!
//! Pixels are stored as printable text, four characters per pixel. Each
//! character carries six bits as `value + 33`, so the four characters
//! hold the 24 bits of one RGB pixel, most significant bits first.

use crate::error::{RenderError, RenderResult};
use crate::types::Extent2D;

pub const WIDTH: u32 = 20;
pub const HEIGHT: u32 = 20;

const CHARS_PER_PIXEL: usize = 4;
const FIRST_CHAR: u8 = b'!';
const LAST_CHAR: u8 = FIRST_CHAR + 63;

pub const PACKED: &str = concat!(
    "````````^04U5V.4!Q-$'BI;?(BYK[OLUN,3`@X^````````````````````````",
    "````````````````````````H*S=!!!!!!!!!!!!&R=8L;WNU^04YO,C````````",
    "````````````````````````````````````````15&\"!!!!!!!!!!!!!!!!2E:'",
    "FJ;7`@X^````````````````````````````````````````````[_PL!!!!!!!!",
    "!!!!\"Q=(S-D)````````````````````````````````````````````````````",
    "````B)3%!!!!!!!!!!!!$1U.`P\\_````````````````````````````````````",
    "````````````````Q=(\"!1%\"!!!!!!!!!!!!$Q]0````TM\\/ML+SNL;W[_PL`P\\_",
    "`P\\_````````````````````````````+#AI!!!!!!!!!!!!!!!!$Q]0````7&B9",
    "#AI+K+CIM,#QZ_@H`@X^G*C9````````````````````````%2%2!!!!!!!!!!!!",
    "!!!!$Q]0````86V>!!!!3UN,`P\\_`````P\\_3%B)````````````````````````",
    "#AI+!!!!!!!!!!!!!!!!$Q]0````86V>!!!!)C)C_PL[`````P\\_.T=X````````",
    "````````````````3%B)!!!!!!!!!!!!!!!!$Q]0````A9'\".T=X04U^^@8V````",
    "T=X.$AY/````````````````````````VN<7T-T-!!!!!!!!!!!!$Q]0````````",
    "````````````K+CI!A)#I+#A````````````````````````````````K[OL!1%\"",
    "!!!!$Q]0````;WNL&\"15(2U>=(\"Q````Q-$!````````````````````````````",
    "````````````#!A)!1%\"%2%2````86V>!!!!!!!!!!!!E:'2`@X^O,CY````````",
    "````````````````````````````GZO<,3UNXN\\?````86V>!!!!!!!!!!!!(R]@",
    "````F*35`0T]````````````````````````````````````!!!!````````86V>",
    "!!!!!!!!!!!!!!!!HJ[?````:W>H````````````````````````````````````",
    "1E*#````````:'2E!!!!2E:'$1U.!!!!1E*#_`P\\U^04ZO<G````````````````",
    "````````````R]@(PL[_````I;'B.$1UML+SR]@(````N,3U````T=X.+#AIKKKK",
    "````````````````````````^04U=(\"Q`````````@X^`0T]^@8VHJ[?````````",
    "`````````0T]`0T]````````````````]`0T[/DI>86V=H*SL+SM````````\\_`P",
    "DI[/3%B)\\/TM````````````````````````````````````[_PL>H:WIK+CY?(B",
    "````````````^`@XGZO<YO,C_PL[````````````````````````````````````",
);

/// A decoded RGBA8 image, rows top to bottom.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pixmap {
    pub extent: Extent2D,
    pub rgba: Vec<u8>,
}

impl Pixmap {
    pub fn embedded() -> RenderResult<Self> {
        Self::decode(Extent2D::new(WIDTH, HEIGHT), PACKED.as_bytes())
    }

    /// Decodes packed text into opaque RGBA.
    pub fn decode(extent: Extent2D, packed: &[u8]) -> RenderResult<Self> {
        let pixels = extent.width as usize * extent.height as usize;
        if packed.len() != pixels * CHARS_PER_PIXEL {
            return Err(RenderError::ImageData("length does not match extent"));
        }

        let mut rgba = Vec::with_capacity(pixels * 4);
        for group in packed.chunks_exact(CHARS_PER_PIXEL) {
            let [r, g, b] = decode_pixel(group)?;
            rgba.extend_from_slice(&[r, g, b, u8::MAX]);
        }
        Ok(Self { extent, rgba })
    }

    pub fn byte_len(&self) -> u64 {
        self.rgba.len() as u64
    }
}

fn decode_pixel(group: &[u8]) -> RenderResult<[u8; 3]> {
    let mut c = [0u8; CHARS_PER_PIXEL];
    for (dst, &ch) in c.iter_mut().zip(group) {
        if !(FIRST_CHAR..=LAST_CHAR).contains(&ch) {
            return Err(RenderError::ImageData("character outside the packed range"));
        }
        *dst = ch - FIRST_CHAR;
    }
    Ok([
        (c[0] << 2) | (c[1] >> 4),
        ((c[1] & 0xF) << 4) | (c[2] >> 2),
        ((c[2] & 0x3) << 6) | c[3],
    ])
}

#[cfg(test)]
pub(crate) fn encode_pixel([r, g, b]: [u8; 3]) -> [u8; 4] {
    [
        FIRST_CHAR + (r >> 2),
        FIRST_CHAR + (((r & 0x3) << 4) | (g >> 4)),
        FIRST_CHAR + (((g & 0xF) << 2) | (b >> 6)),
        FIRST_CHAR + (b & 0x3F),
    ]
}
