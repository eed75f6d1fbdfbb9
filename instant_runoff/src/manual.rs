/*!

This is the long-form manual for `instant_runoff` and `irvcount`.

## Counting rules

Each round, every ballot counts for its most preferred candidate that is still running.
Ballots that rank nobody still running are *exhausted* for the round: they count for
nobody but they stay in the total used for percentages.

A candidate wins the round when either:
 - it is the only candidate still running, or
 - `votes * 100 / total_ballots` (integer division) reaches the winning percentage,
   51 by default. With 200 ballots, 101 votes is only 50% and does not win.

When two candidates reach the same percentage (only possible with a low winning
percentage), the one listed first on the roster wins.

Without a winner, the candidate with the fewest votes is eliminated and the ballots are
counted again. Exactly one candidate is eliminated per round.

## Tie-breaking

When several candidates share the lowest count, the tie breaker picks the one to
eliminate. The available modes are:

* `random` uniformly random, seeded by the operating system. When `randomSeed` is also set,
  it behaves as `randomSeeded`.
* `randomSeeded` uniformly random from the `randomSeed` setting: reruns eliminate the same candidates
* `hashed` a sha256-based permutation of the tied names, using `randomSeed`. It gives the
  same result on every platform and every version of the random number generator.
* `useCandidateOrder` the tied candidate that comes first in the roster is eliminated

Library users can pass any closure `FnMut(&[&Candidate], RoundId) -> usize` to
[`crate::Election::with_tie_breaker`].

## Input formats

The ballot file is a list of `rank,name` records, one per line:

```text
1,Ollie
2,Alicia
3,George
1,Alicia
2,George
```

A record of rank `1` starts a new ballot, the following records append the next choices.
The name is everything after the first comma, so names may contain commas. Names must
match a registered candidate exactly (case included).

The following providers read this layout:
* `csv` a comma-separated text file
* `xlsx` the first two columns of an Excel worksheet. The rank may be stored as a number
  or as text.

## Configuration

`irvcount` reads a JSON configuration file:

```text
{
  "outputSettings": { "contestName": "Club president", "outputDirectory": "output" },
  "cvrFileSources": [ { "filePath": "ballots.csv", "provider": "csv", "firstVoteRowIndex": 1 } ],
  "candidates": [ { "name": "Ollie" }, { "name": "Alicia" } ],
  "rules": { "tiebreakMode": "useCandidateOrder", "winningPercentage": 51 }
}
```

FileSource:
 - `filePath` (string): relative to the configuration file.
 - `provider` (string): `csv` or `xlsx`.
 - `excelWorksheetName` (string, optional): for `xlsx`, the worksheet to read. Defaults to the first one.
 - `firstVoteRowIndex` (string or number, optional): the 1-based row of the first record. Rows
   before it are skipped (header rows for example).

Rules:
 - `tiebreakMode` (string, optional): see above. Defaults to `random`.
 - `randomSeed` (string or number, optional): the seed of `randomSeeded` and `hashed`.
 - `winningPercentage` (string or number, optional): between 1 and 100, defaults to 51.
 - `rejectDuplicateCandidates` (boolean, optional): refuse ballots that rank a candidate twice.

Every option of the configuration file can be overridden on the command line, see `irvcount --help`.

## Summary

The summary lists every round with its `tally` and its `tallyResults`. An eliminated
candidate comes with the `transfers` of its ballots, the number of `exhausted` ballots if
any, and `tiedWith`, the other candidates that shared the lowest count, when there was a
tie. JSON objects are written with their keys sorted by name, so candidates appear in
alphabetical order rather than roster order. The `--reference` comparison reads the
reference file the same way, so its key order does not matter.

 */
