//! Tests for string addressing and linkage tables

use super::*;
use crate::error::FciError;

#[test]
fn test_num_strings() {
    assert_eq!(num_strings(4, 2).unwrap(), 6);
    assert_eq!(num_strings(6, 3).unwrap(), 20);
    assert_eq!(num_strings(5, 0).unwrap(), 1);
    assert_eq!(num_strings(8, 8).unwrap(), 1);
}

#[test]
fn test_invalid_configuration() {
    assert!(matches!(
        num_strings(3, 4),
        Err(FciError::InvalidConfiguration(_))
    ));
    assert!(matches!(
        num_strings(0, 0),
        Err(FciError::InvalidConfiguration(_))
    ));
    assert!(matches!(
        num_strings(65, 1),
        Err(FciError::InvalidConfiguration(_))
    ));
    assert!(FciSpace::new(4, (5, 1)).is_err());
    assert!(addr2str(4, 2, 6).is_err());
    // wrong electron count and bits outside the orbital range
    assert!(str2addr(4, 2, 0b111).is_err());
    assert!(str2addr(4, 2, 0b10001).is_err());
}

#[test]
fn test_strings_are_ascending() {
    let strings = make_strings(4, 2).unwrap();
    assert_eq!(strings, vec![0b0011, 0b0101, 0b0110, 0b1001, 0b1010, 0b1100]);
}

#[test]
fn test_address_bijection() {
    for norb in 1..=8 {
        for nelec in 0..=norb {
            let strings = make_strings(norb, nelec).unwrap();
            assert_eq!(strings.len(), num_strings(norb, nelec).unwrap());
            for (addr, &string) in strings.iter().enumerate() {
                assert_eq!(str2addr(norb, nelec, string).unwrap(), addr);
                assert_eq!(addr2str(norb, nelec, addr).unwrap(), string);
            }
        }
    }
}

#[test]
fn test_cre_des_sign() {
    // a+_2 a_0 on |0,1>: passes orbital 1
    assert_eq!(cre_des_sign(2, 0, 0b011), -1);
    // a+_3 a_0 on |0,1,2>: passes orbitals 1 and 2
    assert_eq!(cre_des_sign(3, 0, 0b0111), 1);
    // a+_1 a_0 on |0>: adjacent
    assert_eq!(cre_des_sign(1, 0, 0b01), 1);
    // forbidden excitations
    assert_eq!(cre_des_sign(1, 0, 0b11), 0);
    assert_eq!(cre_des_sign(2, 3, 0b011), 0);
    assert_eq!(cre_des_sign(0, 0, 0b01), 1);
}

#[test]
fn test_link_table_shape_and_diagonal() {
    let table = LinkTable::new(5, 2).unwrap();
    assert_eq!(table.num_strings(), 10);
    assert_eq!(table.num_links(), 2 + 2 * 3);

    for addr in 0..table.num_strings() {
        let string = table.string(addr);
        let occ: Vec<usize> = table.occupations(addr).collect();
        assert_eq!(occ, occupied_orbitals(string));
        for entry in &table.links(addr)[..2] {
            assert_eq!(entry.create, entry.annihilate);
            assert_eq!(entry.address, addr);
            assert_eq!(entry.sign, 1);
        }
    }
}

#[test]
fn test_link_entries_are_consistent_with_strings() {
    let table = LinkTable::new(6, 3).unwrap();
    for addr in 0..table.num_strings() {
        let string = table.string(addr);
        for entry in table.links(addr) {
            let (a, i) = (entry.create(), entry.annihilate());
            let target = if a == i {
                string
            } else {
                (string ^ (1u64 << i)) | (1u64 << a)
            };
            assert_eq!(table.string(entry.address), target);
            assert_eq!(entry.sign, cre_des_sign(a, i, string));
            assert_eq!(entry.pair_index(), crate::tensor::pair_index(a, i));
        }
    }
}

#[test]
fn test_link_reciprocity() {
    for (norb, nelec) in [(4, 2), (5, 3), (6, 2), (7, 4)] {
        let table = LinkTable::new(norb, nelec).unwrap();
        for addr in 0..table.num_strings() {
            for entry in table.links(addr) {
                let back = table
                    .links(entry.address)
                    .iter()
                    .find(|e| {
                        e.create == entry.annihilate
                            && e.annihilate == entry.create
                            && e.address == addr
                    })
                    .expect("inverse excitation must be present");
                assert_eq!(back.sign, entry.sign);
            }
        }
    }
}

#[test]
fn test_link_table_is_deterministic() {
    let first = LinkTable::new(6, 3).unwrap();
    let second = LinkTable::new(6, 3).unwrap();
    for addr in 0..first.num_strings() {
        assert_eq!(first.links(addr), second.links(addr));
    }
}

#[test]
fn test_space_shares_links_for_ms0() {
    let ms0 = FciSpace::new(4, (2, 2)).unwrap();
    assert!(ms0.shares_links());
    assert_eq!(ms0.ndet(), 36);

    let high_spin = FciSpace::new(4, (3, 1)).unwrap();
    assert!(!high_spin.shares_links());
    assert_eq!(high_spin.na(), 4);
    assert_eq!(high_spin.nb(), 4);

    let from_total = FciSpace::new(4, 3).unwrap();
    assert_eq!(from_total.nelec(), Nelec::new(2, 1));
}

#[test]
fn test_empty_and_full_strings() {
    let space = FciSpace::new(3, (0, 3)).unwrap();
    assert_eq!(space.na(), 1);
    assert_eq!(space.nb(), 1);
    assert!(space.links_a().links(0).is_empty());
    assert_eq!(space.links_b().links(0).len(), 3);
}
