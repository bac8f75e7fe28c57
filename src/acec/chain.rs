//! Carry chains: adders linked through their first operand.
//!
//! After [`chain_lengths`], operand 0 of every adder is the carry of the longest chain feeding
//! it, so a chain is walked by following operand 0 through the carry map.

use std::collections::HashMap;

use log::debug;

use crate::{Aig, NodeId, Result, aig::trav::TravIds};

use super::{AcecError, adder::Adder};

/// Maps every carry node to the index of its adder.
pub fn carry_map(adders: &[Adder]) -> Result<HashMap<NodeId, usize>> {
    let mut map = HashMap::with_capacity(adders.len());
    for (i, adder) in adders.iter().enumerate() {
        if let Some(first) = map.insert(adder.carry, i) {
            return Err(AcecError::DuplicateCarry {
                carry: adder.carry,
                first,
                second: i,
            }
            .into());
        }
    }
    Ok(map)
}

/// Length of the longest chain ending in each adder, the adder itself included.
///
/// Operands are reordered on the way so that operand 0 leads to the longest chain.
pub fn chain_lengths(adders: &mut [Adder], map: &HashMap<NodeId, usize>) -> Vec<usize> {
    let mut lengths: Vec<Option<usize>> = vec![None; adders.len()];
    let mut stack: Vec<(usize, bool)> = Vec::new();
    for start in 0..adders.len() {
        if lengths[start].is_some() {
            continue;
        }
        stack.push((start, false));
        while let Some((i, expanded)) = stack.pop() {
            if lengths[i].is_some() {
                continue;
            }
            if !expanded {
                stack.push((i, true));
                for input in adders[i].inputs {
                    if let Some(&j) = map.get(&input) {
                        if lengths[j].is_none() {
                            stack.push((j, false));
                        }
                    }
                }
                continue;
            }
            let lens: Vec<usize> = adders[i]
                .inputs
                .iter()
                .map(|input| {
                    map.get(input)
                        .and_then(|&j| lengths[j])
                        .unwrap_or(0)
                })
                .collect();
            let len = lens.iter().copied().max().unwrap_or(0);
            if lens[0] < len {
                if lens[1] == len {
                    adders[i].swap_inputs(0, 1);
                } else if lens[2] == len {
                    adders[i].swap_inputs(0, 2);
                }
            }
            lengths[i] = Some(len + 1);
        }
    }
    lengths.into_iter().map(|l| l.unwrap_or(1)).collect()
}

/// Collects the topmost chains with at least `min_len` adders, each from its lowest adder up.
/// Once a chain is taken, the cones of its outputs are marked, and chains running into
/// marked logic are cut there.
pub fn collect_chains(
    aig: &Aig,
    adders: &[Adder],
    map: &HashMap<NodeId, usize>,
    min_len: usize,
) -> Result<Vec<Vec<usize>>> {
    let mut below_top = vec![false; adders.len()];
    for adder in adders {
        if let Some(&j) = map.get(&adder.inputs[0]) {
            below_top[j] = true;
        }
    }

    let mut marks = TravIds::new(aig.num_nodes());
    marks.increment();
    let mut chains = Vec::new();
    for top in 0..adders.len() {
        if below_top[top] {
            continue;
        }
        let mut chain = Vec::new();
        let mut current = Some(top);
        while let Some(i) = current {
            let adder = &adders[i];
            if marks.is_current(adder.sum) || marks.is_current(adder.carry) || chain.contains(&i)
            {
                break;
            }
            chain.push(i);
            current = map.get(&adder.inputs[0]).copied();
        }
        chain.reverse();
        if chain.is_empty() || chain.len() < min_len {
            continue;
        }
        for &i in &chain {
            for id in aig.cone(&[adders[i].sum, adders[i].carry]) {
                marks.set_current(id);
            }
        }
        chains.push(chain);
    }
    debug!(
        "{} chains of at least {} adders, {} adders in chains",
        chains.len(),
        min_len,
        chains.iter().map(|c| c.len()).sum::<usize>()
    );
    Ok(chains)
}

/// Checks that no sum or carry node is claimed twice by the adders of the given chains.
pub fn check_chain_mapping(adders: &[Adder], chains: &[Vec<usize>]) -> Result<()> {
    let mut owner: HashMap<NodeId, usize> = HashMap::new();
    for chain in chains {
        for &i in chain {
            for output in [adders[i].sum, adders[i].carry] {
                if let Some(first) = owner.insert(output, i) {
                    return Err(AcecError::DuplicateCarry {
                        carry: output,
                        first,
                        second: i,
                    }
                    .into());
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::acec::{adder::AdderSet, cuts::CutParams, testing};

    #[test]
    fn carry_map_test() {
        let fa = Adder::from_truths([1, 2, 3], 4, 5, (0x96, 0xE8)).unwrap();
        let map = carry_map(&[fa]).unwrap();
        assert_eq!(map.get(&5), Some(&0));
        assert!(carry_map(&[fa, fa]).is_err());
    }

    #[test]
    fn chain_lengths_test() {
        // carry of the first adder enters the second one through operand 2
        let low = Adder::from_truths([1, 2, 3], 4, 5, (0x96, 0xE8)).unwrap();
        let high = Adder::from_truths([6, 7, 5], 8, 9, (0x96, 0x8E)).unwrap();
        let mut adders = vec![low, high];
        let map = carry_map(&adders).unwrap();
        let lengths = chain_lengths(&mut adders, &map);
        assert_eq!(lengths, vec![1, 2]);
        assert_eq!(adders[1].inputs, [5, 7, 6]);
        // the phase of the complemented operand moved along
        assert_eq!(adders[1].signs.input_phase(), 0b001);
    }

    #[test]
    fn collect_chains_test() {
        let aig = testing::ripple_carry_adder(4, true);
        let set = AdderSet::detect(&aig, CutParams::default()).unwrap();
        let mut adders = set.adders().to_vec();
        let map = carry_map(&adders).unwrap();
        let lengths = chain_lengths(&mut adders, &map);
        assert_eq!(lengths.iter().max(), Some(&4));

        let chains = collect_chains(&aig, &adders, &map, 2).unwrap();
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0].len(), 4);
        check_chain_mapping(&adders, &chains).unwrap();
        assert!(collect_chains(&aig, &adders, &map, 5).unwrap().is_empty());
    }
}
