//! Composite data interpreter.
//!
//! Walks composite record bytes under control of a [`CompiledFormat`],
//! swapping every element at its declared width. Format reuse follows
//! Fortran rules: when the codes run out while data remains, execution
//! resumes at the last group that was closed (or at the start if none was).

use crate::format::{CompiledFormat, Item, GROUP_END, RUNTIME_GROUP};
use crate::swap::SwapDirection;

/// Repeat count for an item that runs to the end of the data.
const TO_END: usize = usize::MAX;

/// State of one open parenthesis.
#[derive(Debug, Clone, Copy)]
struct GroupFrame {
    /// 1-based code index of the `(`.
    left: usize,
    /// Required passes over the group body.
    repeat: usize,
    /// Passes completed so far.
    done: usize,
}

/// Swaps composite record bytes in place.
///
/// `data` excludes the format tagsegment and the data bank header. Elements
/// that would run past the end of `data` are left untouched, and so is a
/// tail shorter than a count word: such a tail is padding.
pub fn swap_composite_bytes(data: &mut [u8], format: &CompiledFormat, direction: SwapDirection) {
    let codes = format.codes();
    let code_count = codes.len();
    let end = data.len();

    let mut pos = 0usize;
    let mut imt = 0usize;
    let mut resume = 0usize;
    let mut stack: Vec<GroupFrame> = Vec::new();
    let mut idle_items = 0usize;

    'data: while pos < end {
        let (item, mut count) = loop {
            imt += 1;
            if imt > code_count {
                imt = resume;
                continue;
            }

            let code = codes[imt - 1];
            if code == GROUP_END {
                let Some(frame) = stack.last_mut() else {
                    // Compiled formats always balance; treat a stray ')' as
                    // the end of the format.
                    imt = code_count;
                    continue;
                };
                frame.done += 1;
                if frame.done >= frame.repeat {
                    resume = frame.left - 1;
                    stack.pop();
                } else {
                    imt = frame.left;
                }
                continue;
            }

            let mut count = usize::from(code / 16);
            let mut kind = code % 16;
            if kind == RUNTIME_GROUP {
                kind = 0;
                let Some(value) = read_count(data, &mut pos, direction) else {
                    break 'data;
                };
                count = value;
            }
            if kind == 0 {
                stack.push(GroupFrame {
                    left: imt,
                    repeat: count,
                    done: 0,
                });
                continue;
            }

            // A single item closing the format's last group repeats to the
            // end of the data.
            if let Some(frame) = stack.last() {
                if imt + 1 == code_count && imt == frame.left + 1 {
                    count = TO_END;
                }
            }
            break (kind, count);
        };

        if count == 0 {
            let Some(value) = read_count(data, &mut pos, direction) else {
                break;
            };
            count = value;
        }

        let Some(item) = Item::from_code(item) else {
            continue;
        };
        let width = item.width();
        let available = (end - pos) / width;
        let n = count.min(available);
        if width > 1 {
            for element in data[pos..pos + n * width].chunks_exact_mut(width) {
                element.reverse();
            }
        }
        pos += n * width;

        // Remaining bytes too short for any element the format will ever
        // ask for: leave them as they are.
        if n == 0 && count > 0 {
            idle_items += 1;
            if idle_items > code_count {
                break;
            }
        } else {
            idle_items = 0;
        }
    }
}

/// Reads a 32-bit repeat count at `pos`, swapping it in place.
fn read_count(data: &mut [u8], pos: &mut usize, direction: SwapDirection) -> Option<usize> {
    let start = *pos;
    let bytes = data.get_mut(start..start + 4)?;
    let mut word = u32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let value = direction.swap_word(&mut word);
    bytes.copy_from_slice(&word.to_ne_bytes());
    *pos += 4;
    Some(value as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(format: &str) -> CompiledFormat {
        CompiledFormat::compile(format).unwrap()
    }

    fn ne32(v: u32) -> [u8; 4] {
        v.to_ne_bytes()
    }

    #[test]
    fn swap_simple_items() {
        let mut data = Vec::new();
        data.extend_from_slice(&ne32(0x0102_0304));
        data.extend_from_slice(&0x0506u16.to_ne_bytes());
        data.extend_from_slice(&[0x07, 0x08]);

        let original = data.clone();
        swap_composite_bytes(&mut data, &compile("i,s,2c"), SwapDirection::ToForeign);

        assert_eq!(&data[0..4], &0x0102_0304u32.swap_bytes().to_ne_bytes());
        assert_eq!(&data[4..6], &0x0506u16.swap_bytes().to_ne_bytes());
        assert_eq!(&data[6..8], &[0x07, 0x08]);

        swap_composite_bytes(&mut data, &compile("i,s,2c"), SwapDirection::ToLocal);
        assert_eq!(data, original);
    }

    #[test]
    fn format_reuse_covers_all_data() {
        // "i" applied repeatedly until the data is exhausted.
        let mut data: Vec<u8> = (1u32..=4).flat_map(ne32).collect();
        swap_composite_bytes(&mut data, &compile("i"), SwapDirection::ToForeign);
        let expected: Vec<u8> = (1u32..=4).flat_map(|v| ne32(v.swap_bytes())).collect();
        assert_eq!(data, expected);
    }

    #[test]
    fn runtime_group_count_read_in_local_order() {
        // N(i,D): count 2, then two (u32, f64) records.
        let mut data = Vec::new();
        data.extend_from_slice(&ne32(2));
        for i in 0..2u32 {
            data.extend_from_slice(&ne32(10 + i));
            data.extend_from_slice(&(1.5f64 + f64::from(i)).to_ne_bytes());
        }
        let original = data.clone();
        let format = compile("N(i,D)");

        swap_composite_bytes(&mut data, &format, SwapDirection::ToForeign);
        assert_eq!(&data[0..4], &ne32(2u32.swap_bytes()));
        assert_eq!(&data[4..8], &ne32(10u32.swap_bytes()));

        swap_composite_bytes(&mut data, &format, SwapDirection::ToLocal);
        assert_eq!(data, original);
    }

    #[test]
    fn runtime_item_count() {
        // Ns: count 3, then three u16 values, then padding to a word.
        let mut data = Vec::new();
        data.extend_from_slice(&ne32(3));
        for v in [1u16, 2, 3] {
            data.extend_from_slice(&v.to_ne_bytes());
        }
        data.extend_from_slice(&[0, 0]);
        let original = data.clone();

        swap_composite_bytes(&mut data, &compile("Ns"), SwapDirection::ToForeign);
        assert_eq!(&data[4..6], &1u16.swap_bytes().to_ne_bytes());
        swap_composite_bytes(&mut data, &compile("Ns"), SwapDirection::ToLocal);
        assert_eq!(data, original);
    }

    #[test]
    fn nested_groups() {
        let format = compile("2(i,2(s))");
        let mut data = Vec::new();
        for i in 0..2u32 {
            data.extend_from_slice(&ne32(i));
            data.extend_from_slice(&7u16.to_ne_bytes());
            data.extend_from_slice(&8u16.to_ne_bytes());
        }
        let original = data.clone();
        swap_composite_bytes(&mut data, &format, SwapDirection::ToForeign);
        assert_eq!(&data[4..6], &7u16.swap_bytes().to_ne_bytes());
        assert_eq!(&data[14..16], &8u16.swap_bytes().to_ne_bytes());
        swap_composite_bytes(&mut data, &format, SwapDirection::ToLocal);
        assert_eq!(data, original);
    }

    #[test]
    fn short_tail_left_untouched() {
        let mut data = vec![1, 2, 3, 4, 5, 6];
        swap_composite_bytes(&mut data, &compile("D"), SwapDirection::ToForeign);
        assert_eq!(data, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn partial_count_word_is_padding() {
        let mut data = vec![1, 2];
        swap_composite_bytes(&mut data, &compile("Ni"), SwapDirection::ToLocal);
        assert_eq!(data, vec![1, 2]);
    }
}
