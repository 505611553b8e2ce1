//! 2D simplex noise.
//!
//! Lattice hashing uses the permutation polynomial `(34x^2 + x) mod 289` instead of a
//! lookup table, and gradients are spread over a 41-point ring derived from the hash.
//! Everything is a pure function of the input coordinate, so identical inputs give
//! bit-identical results on every run.

/// (3 - sqrt(3)) / 6, the unskew factor.
const G2: f32 = 0.211_324_87;
/// (sqrt(3) - 1) / 2, the skew factor.
const F2: f32 = 0.366_025_4;
/// -1 + 2 * G2, offset to the far corner of the simplex.
const FAR: f32 = -0.577_350_26;
/// 1 / 41, ring size for gradient selection.
const RING: f32 = 0.024_390_243;

#[inline]
fn mod289(x: f32) -> f32 {
    x - (x * (1.0 / 289.0)).floor() * 289.0
}

#[inline]
fn permute(x: f32) -> f32 {
    mod289((x * 34.0 + 1.0) * x)
}

#[inline]
fn fract(x: f32) -> f32 {
    x - x.floor()
}

/// Coherent noise at `(x, y)`, roughly in `[-1, 1]`.
pub fn noise2(x: f32, y: f32) -> f32 {
    // Skew into simplex space and find the containing cell.
    let s = (x + y) * F2;
    let ix = (x + s).floor();
    let iy = (y + s).floor();

    let t = (ix + iy) * G2;
    let x0 = (x - ix + t, y - iy + t);

    // Middle corner: lower or upper triangle of the cell.
    let (i1x, i1y) = if x0.0 > x0.1 { (1.0, 0.0) } else { (0.0, 1.0) };

    let x1 = (x0.0 + G2 - i1x, x0.1 + G2 - i1y);
    let x2 = (x0.0 + FAR, x0.1 + FAR);

    let ix = mod289(ix);
    let iy = mod289(iy);
    let p = [
        permute(permute(iy) + ix),
        permute(permute(iy + i1y) + ix + i1x),
        permute(permute(iy + 1.0) + ix + 1.0),
    ];

    let offsets = [x0, x1, x2];
    let mut sum = 0.0f32;
    for (corner, (dx, dy)) in offsets.into_iter().enumerate() {
        let falloff = (0.5 - (dx * dx + dy * dy)).max(0.0);
        let mut m = falloff * falloff;
        m *= m;

        let gx = 2.0 * fract(p[corner] * RING) - 1.0;
        let h = gx.abs() - 0.5;
        let a0 = gx - (gx + 0.5).floor();

        // Approximate gradient normalisation, folded into the falloff.
        m *= 1.792_842_9 - 0.853_734_7 * (a0 * a0 + h * h);

        sum += m * (a0 * dx + h * dy);
    }

    130.0 * sum
}
