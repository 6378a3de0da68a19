use crate::codec::CodecError;

/// One step of a chosen parse. `distance == 0` marks a literal
/// (`length` is then 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub length: usize,
    pub distance: usize,
}

/// Bit costs of one codec's token set. `match_cost` returns `None` for
/// combinations the token set cannot encode.
pub trait CostModel {
    const MAX_DISTANCE: usize;
    const MAX_LENGTH: usize;
    const LITERAL_COST: u32;

    fn match_cost(length: usize, distance: usize) -> Option<u32>;
}

/// Shortest-path parse of `data`: forward relaxation over every encodable
/// literal and match edge, then a backward walk over the chosen edges.
pub fn parse<M: CostModel>(data: &[u8]) -> Result<Vec<Edge>, CodecError> {
    let n = data.len();
    let mut cost = try_filled(n + 1, u32::MAX)?;
    let mut taken = try_filled(
        n + 1,
        Edge {
            length: 0,
            distance: 0,
        },
    )?;
    cost[0] = 0;

    for pos in 0..n {
        let here = cost[pos];

        let literal = here.saturating_add(M::LITERAL_COST);
        if literal < cost[pos + 1] {
            cost[pos + 1] = literal;
            taken[pos + 1] = Edge {
                length: 1,
                distance: 0,
            };
        }

        let window_start = pos.saturating_sub(M::MAX_DISTANCE);
        let limit = M::MAX_LENGTH.min(n - pos);
        for src in window_start..pos {
            if data[src] != data[pos] {
                continue;
            }
            let mut length = 1;
            while length < limit && data[src + length] == data[pos + length] {
                length += 1;
            }
            let distance = pos - src;
            for len in 2..=length {
                let Some(bits) = M::match_cost(len, distance) else {
                    continue;
                };
                let total = here.saturating_add(bits);
                if total < cost[pos + len] {
                    cost[pos + len] = total;
                    taken[pos + len] = Edge {
                        length: len,
                        distance,
                    };
                }
            }
        }
    }

    let mut edges = Vec::new();
    edges
        .try_reserve(n)
        .map_err(|_| CodecError::OutOfMemory)?;
    let mut pos = n;
    while pos > 0 {
        let edge = taken[pos];
        debug_assert!(edge.length > 0, "unreachable parse position {pos}");
        edges.push(edge);
        pos -= edge.length;
    }
    edges.reverse();
    Ok(edges)
}

fn try_filled<T: Copy>(len: usize, value: T) -> Result<Vec<T>, CodecError> {
    let mut v = Vec::new();
    v.try_reserve_exact(len).map_err(|_| CodecError::OutOfMemory)?;
    v.resize(len, value);
    Ok(v)
}
