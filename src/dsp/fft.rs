// FFT module - in-place radix-2 Cooley-Tukey transform
//
// The offline analysis path computes spectra on demand from static sample
// data, so the transform here is a plain function over caller-owned buffers:
// bit-reversal permutation followed by log2(N) butterfly stages. No planner,
// no allocation beyond the input buffers.

use std::f64::consts::PI;

/// FFT length used for offline pitch analysis
pub const FFT_SIZE: usize = 4096;

/// In-place complex FFT over split real/imaginary buffers.
///
/// Both slices must have the same power-of-two length; this is a caller
/// contract (checked only via debug assertions, mirroring the "undefined
/// behavior on violation" boundary of the algorithm).
///
/// # Arguments
/// * `re` - Real parts, overwritten with the transform output
/// * `im` - Imaginary parts, overwritten with the transform output
pub fn transform(re: &mut [f64], im: &mut [f64]) {
    debug_assert_eq!(re.len(), im.len(), "real/imag length mismatch");
    let n = re.len();
    debug_assert!(n.is_power_of_two(), "FFT length must be a power of two");
    if n <= 1 {
        return;
    }

    // Bit-reversal permutation
    let mut j = 0usize;
    for i in 1..n {
        let mut bit = n >> 1;
        while j & bit != 0 {
            j ^= bit;
            bit >>= 1;
        }
        j |= bit;
        if i < j {
            re.swap(i, j);
            im.swap(i, j);
        }
    }

    // Iterative butterfly stages at doubling stride
    let mut size = 2usize;
    while size <= n {
        let angle = -2.0 * PI / size as f64;
        let (step_im, step_re) = angle.sin_cos();
        let half = size / 2;

        let mut start = 0usize;
        while start < n {
            let mut tw_re = 1.0f64;
            let mut tw_im = 0.0f64;
            for k in 0..half {
                let even = start + k;
                let odd = even + half;

                let t_re = re[odd] * tw_re - im[odd] * tw_im;
                let t_im = re[odd] * tw_im + im[odd] * tw_re;

                re[odd] = re[even] - t_re;
                im[odd] = im[even] - t_im;
                re[even] += t_re;
                im[even] += t_im;

                let next_re = tw_re * step_re - tw_im * step_im;
                tw_im = tw_re * step_im + tw_im * step_re;
                tw_re = next_re;
            }
            start += size;
        }
        size <<= 1;
    }
}

/// Pre-compute a Hann window of length `n` to reduce spectral leakage.
pub fn hann_window(n: usize) -> Vec<f64> {
    if n < 2 {
        // The n-1 denominator degenerates; a single-sample window is unity
        return vec![1.0; n];
    }
    (0..n)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f64 / (n as f64 - 1.0)).cos()))
        .collect()
}
