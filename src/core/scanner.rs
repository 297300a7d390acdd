// Vectorized structural-character scanning with a portable scalar fallback.
//
// Three backends: AVX2 (32-byte lanes), SSE2 (16-byte lanes), scalar. The
// backend is probed once per process and reused; dispatch happens per call
// on a copied enum, never through dynamic dispatch. Non-x86_64 builds
// compile only the scalar variant.
//
// All kernels follow the same shape: broadcast-compare a register against
// the target byte(s), extract a movemask, take the lowest set bit. A tail
// shorter than one register width falls through to the next-narrower kernel
// and finally to scalar. Every vectorized path is bit-identical to its
// scalar counterpart for all inputs; tests/scanner_equivalence.rs pins this.
//
// The decoded buffer is UTF-8 and every structural character (delimiter,
// quote, \n, \r) is ASCII, so byte-wise comparison can never fire inside a
// multi-byte character: continuation bytes are always >= 0x80.
//
// Quote-aware line-end search is scalar only. Quote-state tracking is a
// sequential dependency, so that configuration has exactly one
// implementation; vectorized line-end search exists only for the
// quoting-disabled configuration.

use std::sync::OnceLock;

/// Scanner backend, selected once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// 32-byte lanes.
    Avx2,
    /// 16-byte lanes. Baseline on x86_64.
    Sse2,
    /// Portable byte-by-byte reference.
    Scalar,
}

/// Which structural character matched in `find_structural`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Structural {
    Delimiter,
    LineFeed,
    CarriageReturn,
}

/// The process-wide backend, probed on first use.
pub fn backend() -> Backend {
    static CHOSEN: OnceLock<Backend> = OnceLock::new();
    *CHOSEN.get_or_init(detect)
}

#[cfg(target_arch = "x86_64")]
fn detect() -> Backend {
    if is_x86_feature_detected!("avx2") {
        Backend::Avx2
    } else {
        // SSE2 is part of the x86_64 baseline.
        Backend::Sse2
    }
}

#[cfg(not(target_arch = "x86_64"))]
fn detect() -> Backend {
    Backend::Scalar
}

// ---------------------------------------------------------------------------
// Public entry points (dispatch once per call)
// ---------------------------------------------------------------------------

/// First occurrence of `target` in `haystack`.
#[inline]
pub fn find_byte(haystack: &[u8], target: u8) -> Option<usize> {
    #[cfg(target_arch = "x86_64")]
    {
        match backend() {
            // SAFETY: backend() returned Avx2 only after the runtime probe.
            Backend::Avx2 => return unsafe { x86::find_byte_avx2(haystack, target) },
            // SAFETY: SSE2 is always available on x86_64.
            Backend::Sse2 => return unsafe { x86::find_byte_sse2(haystack, target) },
            Backend::Scalar => {}
        }
    }
    find_byte_scalar(haystack, target)
}

/// First line-ending character (`\n` or `\r`). Quoting-disabled path only.
#[inline]
pub fn find_line_end(haystack: &[u8]) -> Option<usize> {
    #[cfg(target_arch = "x86_64")]
    {
        match backend() {
            // SAFETY: as in find_byte.
            Backend::Avx2 => return unsafe { x86::find_line_end_avx2(haystack) },
            Backend::Sse2 => return unsafe { x86::find_line_end_sse2(haystack) },
            Backend::Scalar => {}
        }
    }
    find_line_end_scalar(haystack)
}

/// First of {`delimiter`, `\n`, `\r`}, reporting which kind matched.
#[inline]
pub fn find_structural(haystack: &[u8], delimiter: u8) -> Option<(usize, Structural)> {
    #[cfg(target_arch = "x86_64")]
    {
        match backend() {
            // SAFETY: as in find_byte.
            Backend::Avx2 => return unsafe { x86::find_structural_avx2(haystack, delimiter) },
            Backend::Sse2 => return unsafe { x86::find_structural_sse2(haystack, delimiter) },
            Backend::Scalar => {}
        }
    }
    find_structural_scalar(haystack, delimiter)
}

/// First unquoted line-ending character, toggling `in_quote` on every quote
/// character seen along the way.
///
/// Doubled quotes (`""`) toggle twice, leaving the state unchanged, which is
/// exactly what quoted-field semantics require, so no lookahead is needed.
/// The caller persists `in_quote` across buffer refills while a line spans
/// them.
#[inline]
pub fn find_line_end_quoted(haystack: &[u8], quote: u8, in_quote: &mut bool) -> Option<usize> {
    for (i, &b) in haystack.iter().enumerate() {
        if b == quote {
            *in_quote = !*in_quote;
        } else if (b == b'\n' || b == b'\r') && !*in_quote {
            return Some(i);
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Scalar reference implementations
// ---------------------------------------------------------------------------
//
// Public: the equivalence tests compare the vectorized kernels against these.

pub fn find_byte_scalar(haystack: &[u8], target: u8) -> Option<usize> {
    haystack.iter().position(|&b| b == target)
}

pub fn find_line_end_scalar(haystack: &[u8]) -> Option<usize> {
    haystack.iter().position(|&b| b == b'\n' || b == b'\r')
}

pub fn find_structural_scalar(haystack: &[u8], delimiter: u8) -> Option<(usize, Structural)> {
    for (i, &b) in haystack.iter().enumerate() {
        if b == delimiter {
            return Some((i, Structural::Delimiter));
        }
        if b == b'\n' {
            return Some((i, Structural::LineFeed));
        }
        if b == b'\r' {
            return Some((i, Structural::CarriageReturn));
        }
    }
    None
}

#[inline]
fn classify(byte: u8, delimiter: u8) -> Structural {
    if byte == delimiter {
        Structural::Delimiter
    } else if byte == b'\n' {
        Structural::LineFeed
    } else {
        Structural::CarriageReturn
    }
}

// ---------------------------------------------------------------------------
// x86_64 kernels
// ---------------------------------------------------------------------------

#[cfg(target_arch = "x86_64")]
mod x86 {
    use super::Structural;
    use super::{classify, find_byte_scalar, find_line_end_scalar, find_structural_scalar};
    use std::arch::x86_64::*;

    /// SSE2 lane width.
    const NARROW: usize = 16;
    /// AVX2 lane width.
    const WIDE: usize = 32;

    #[target_feature(enable = "avx2")]
    pub unsafe fn find_byte_avx2(haystack: &[u8], target: u8) -> Option<usize> {
        let needle = _mm256_set1_epi8(target as i8);
        let mut i = 0;
        while i + WIDE <= haystack.len() {
            // SAFETY: i + 32 <= len; unaligned load.
            let v = unsafe { _mm256_loadu_si256(haystack.as_ptr().add(i) as *const __m256i) };
            let mask = _mm256_movemask_epi8(_mm256_cmpeq_epi8(v, needle)) as u32;
            if mask != 0 {
                return Some(i + mask.trailing_zeros() as usize);
            }
            i += WIDE;
        }
        // Remainder: next-narrower kernel, then scalar.
        unsafe { find_byte_sse2(&haystack[i..], target) }.map(|off| i + off)
    }

    #[target_feature(enable = "sse2")]
    pub unsafe fn find_byte_sse2(haystack: &[u8], target: u8) -> Option<usize> {
        let needle = _mm_set1_epi8(target as i8);
        let mut i = 0;
        while i + NARROW <= haystack.len() {
            // SAFETY: i + 16 <= len; unaligned load.
            let v = unsafe { _mm_loadu_si128(haystack.as_ptr().add(i) as *const __m128i) };
            let mask = _mm_movemask_epi8(_mm_cmpeq_epi8(v, needle)) as u32;
            if mask != 0 {
                return Some(i + mask.trailing_zeros() as usize);
            }
            i += NARROW;
        }
        find_byte_scalar(&haystack[i..], target).map(|off| i + off)
    }

    #[target_feature(enable = "avx2")]
    pub unsafe fn find_line_end_avx2(haystack: &[u8]) -> Option<usize> {
        let lf = _mm256_set1_epi8(b'\n' as i8);
        let cr = _mm256_set1_epi8(b'\r' as i8);
        let mut i = 0;
        while i + WIDE <= haystack.len() {
            // SAFETY: i + 32 <= len; unaligned load.
            let v = unsafe { _mm256_loadu_si256(haystack.as_ptr().add(i) as *const __m256i) };
            let hits = _mm256_or_si256(_mm256_cmpeq_epi8(v, lf), _mm256_cmpeq_epi8(v, cr));
            let mask = _mm256_movemask_epi8(hits) as u32;
            if mask != 0 {
                return Some(i + mask.trailing_zeros() as usize);
            }
            i += WIDE;
        }
        unsafe { find_line_end_sse2(&haystack[i..]) }.map(|off| i + off)
    }

    #[target_feature(enable = "sse2")]
    pub unsafe fn find_line_end_sse2(haystack: &[u8]) -> Option<usize> {
        let lf = _mm_set1_epi8(b'\n' as i8);
        let cr = _mm_set1_epi8(b'\r' as i8);
        let mut i = 0;
        while i + NARROW <= haystack.len() {
            // SAFETY: i + 16 <= len; unaligned load.
            let v = unsafe { _mm_loadu_si128(haystack.as_ptr().add(i) as *const __m128i) };
            let hits = _mm_or_si128(_mm_cmpeq_epi8(v, lf), _mm_cmpeq_epi8(v, cr));
            let mask = _mm_movemask_epi8(hits) as u32;
            if mask != 0 {
                return Some(i + mask.trailing_zeros() as usize);
            }
            i += NARROW;
        }
        find_line_end_scalar(&haystack[i..]).map(|off| i + off)
    }

    #[target_feature(enable = "avx2")]
    pub unsafe fn find_structural_avx2(
        haystack: &[u8],
        delimiter: u8,
    ) -> Option<(usize, Structural)> {
        let sep = _mm256_set1_epi8(delimiter as i8);
        let lf = _mm256_set1_epi8(b'\n' as i8);
        let cr = _mm256_set1_epi8(b'\r' as i8);
        let mut i = 0;
        while i + WIDE <= haystack.len() {
            // SAFETY: i + 32 <= len; unaligned load.
            let v = unsafe { _mm256_loadu_si256(haystack.as_ptr().add(i) as *const __m256i) };
            let hits = _mm256_or_si256(
                _mm256_cmpeq_epi8(v, sep),
                _mm256_or_si256(_mm256_cmpeq_epi8(v, lf), _mm256_cmpeq_epi8(v, cr)),
            );
            let mask = _mm256_movemask_epi8(hits) as u32;
            if mask != 0 {
                let pos = i + mask.trailing_zeros() as usize;
                return Some((pos, classify(haystack[pos], delimiter)));
            }
            i += WIDE;
        }
        unsafe { find_structural_sse2(&haystack[i..], delimiter) }
            .map(|(off, kind)| (i + off, kind))
    }

    #[target_feature(enable = "sse2")]
    pub unsafe fn find_structural_sse2(
        haystack: &[u8],
        delimiter: u8,
    ) -> Option<(usize, Structural)> {
        let sep = _mm_set1_epi8(delimiter as i8);
        let lf = _mm_set1_epi8(b'\n' as i8);
        let cr = _mm_set1_epi8(b'\r' as i8);
        let mut i = 0;
        while i + NARROW <= haystack.len() {
            // SAFETY: i + 16 <= len; unaligned load.
            let v = unsafe { _mm_loadu_si128(haystack.as_ptr().add(i) as *const __m128i) };
            let hits = _mm_or_si128(
                _mm_cmpeq_epi8(v, sep),
                _mm_or_si128(_mm_cmpeq_epi8(v, lf), _mm_cmpeq_epi8(v, cr)),
            );
            let mask = _mm_movemask_epi8(hits) as u32;
            if mask != 0 {
                let pos = i + mask.trailing_zeros() as usize;
                return Some((pos, classify(haystack[pos], delimiter)));
            }
            i += NARROW;
        }
        find_structural_scalar(&haystack[i..], delimiter).map(|(off, kind)| (i + off, kind))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
