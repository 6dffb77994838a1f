//! Small GEMM kernel used by batched forward/backward.
//!
//! Computes `C = alpha * A · B` with arbitrary row/column strides, which lets
//! the network express `Wᵀ·A`, `A·dZᵀ` and `W·dZ` against the same row-major
//! buffers without materializing any transpose.
//!
//! - default: a simple, safe triple-loop implementation
//! - optional: a faster backend via the `matrixmultiply` feature

#[allow(clippy::too_many_arguments)]
#[inline]
pub(crate) fn gemm_f32(
    m: usize,
    n: usize,
    k: usize,
    alpha: f32,
    a: &[f32],
    rsa: usize,
    csa: usize,
    b: &[f32],
    rsb: usize,
    csb: usize,
    c: &mut [f32],
    rsc: usize,
    csc: usize,
) {
    debug_assert!(m > 0 && n > 0 && k > 0);
    debug_assert!((m - 1) * rsa + (k - 1) * csa < a.len());
    debug_assert!((k - 1) * rsb + (n - 1) * csb < b.len());
    debug_assert!((m - 1) * rsc + (n - 1) * csc < c.len());

    #[cfg(feature = "matrixmultiply")]
    unsafe {
        matrixmultiply::sgemm(
            m,
            k,
            n,
            alpha,
            a.as_ptr(),
            rsa as isize,
            csa as isize,
            b.as_ptr(),
            rsb as isize,
            csb as isize,
            0.0,
            c.as_mut_ptr(),
            rsc as isize,
            csc as isize,
        );
    }

    #[cfg(not(feature = "matrixmultiply"))]
    for i in 0..m {
        for j in 0..n {
            let mut acc = 0.0_f32;
            let a0 = i * rsa;
            let b0 = j * csb;

            for p in 0..k {
                let av = a[a0 + p * csa];
                let bv = b[p * rsb + b0];
                acc = av.mul_add(bv, acc);
            }

            c[i * rsc + j * csc] = alpha * acc;
        }
    }
}
