use crate::error::{DatasetError, Result};

/// Number of tasks in each set of an overlapping dataset.
///
/// Every set receives `n_tasks / n_sets` tasks and the last set additionally receives the remainder, so
/// `partition(10, 3)` is `[3, 3, 4]`.  Experiment scripts depend on these exact sizes.  A single set may be empty;
/// with several sets every one of them must receive at least one task.
pub fn partition(n_tasks: usize, n_sets: usize) -> Result<Vec<usize>> {
  if n_sets == 0 {
    return Err(DatasetError::InvalidConfiguration("a dataset needs at least one set".into()));
  }
  if n_sets > 1 && n_tasks < n_sets {
    return Err(DatasetError::InvalidConfiguration(
      format!("cannot split {} tasks into {} non-empty sets", n_tasks, n_sets)
    ));
  }
  let per_set = n_tasks / n_sets;
  let mut sizes = vec![per_set; n_sets];
  if let Some(last) = sizes.last_mut() {
    *last += n_tasks % n_sets;
  }
  Ok(sizes)
}

/// Map section of set `set_number`, cycling through `map_sections`.
pub fn section_for_set(map_sections: &[String], set_number: usize) -> Result<&String> {
  if map_sections.is_empty() {
    return Err(DatasetError::InvalidConfiguration("no map sections given".into()));
  }
  Ok(&map_sections[set_number % map_sections.len()])
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn with_remainder() {
    assert_eq!(partition(10, 3).unwrap(), vec![3, 3, 4]);
    assert_eq!(partition(11, 4).unwrap(), vec![2, 2, 2, 5]);
  }

  #[test]
  fn exact_division() {
    assert_eq!(partition(12, 3).unwrap(), vec![4, 4, 4]);
    assert_eq!(partition(7, 1).unwrap(), vec![7]);
  }

  #[test]
  fn sizes_add_up() {
    for n in 1..40 {
      for k in 1..=n {
        let sizes = partition(n, k).unwrap();
        assert_eq!(sizes.len(), k);
        assert_eq!(sizes.iter().sum::<usize>(), n);
      }
    }
  }

  #[test]
  fn invalid() {
    assert!(partition(5, 0).is_err());
    assert!(partition(2, 3).is_err());
    assert!(partition(0, 2).is_err());
  }

  #[test]
  fn empty_single_set() {
    assert_eq!(partition(0, 1).unwrap(), vec![0]);
  }

  #[test]
  fn sections_cycle() {
    let sections: Vec<String> = vec!["square".into(), "street".into()];
    let got: Vec<_> = (0..5).map(|i| section_for_set(&sections, i).unwrap().as_str()).collect();
    assert_eq!(got, vec!["square", "street", "square", "street", "square"]);
    assert!(section_for_set(&[], 0).is_err());
  }
}
