/*!

This is the long-form manual for `voter_alignment` and `pavoter`.

## Input files

The input directory holds, for each county, a set of tab-separated extracts
without header rows, plus one column template shared by all the counties.
The county name is the first word of each file name:

* `<County> FVE ...` the voter extract, one row per voter
* `<County> Election Map ...` the county election numbering
* `<County> Zone Codes ...`, `<County> Zone Types ...` accepted, not used yet
* `column_mapping.csv` the column template

The text is read as Latin-1 (Windows-1252), so stray accented bytes never fail a county.

### Column template

A CSV file with a header. The `Field Description` column lists the semantic name
of every raw position of the voter extracts:

```text
Field Number,Field Description
1,ID Number
2,Title
...
70,Election 1 Vote Method
71,Election 1 Party
```

Election slots must be named `Election <n> Vote Method` and `Election <n> Party`,
where `<n>` is the local election index of the county.

### Election map

```text
ADAMS	1	GENERAL ELECTION	11/08/2022
ADAMS	2	MUNICIPAL PRIMARY	05/16/2023
```

The default layout reads the local index, the description and the date from the
zero-based columns 1, 2 and 3. Older extracts place the columns differently; set
`electionMap` in the configuration instead of guessing.

## Output files

* `<County>_voter_data.csv` one aligned table per county
* `elections.json` the canonical dates and every description seen for them
* `features.json` the canonical columns, `{"demographic": [...], "elections": [...]}`
* `all_counties.csv` the concatenation of the county tables

## Encoding

| Raw field | Output |
|-----------|--------|
| `Gender` | `Gender M`, `Gender F`, `Gender U` (anything but `M`/`F`) |
| `Party Code` | `Party D`, `Party R`, `Party I` (anything but `D`/`R`) |
| `DOB`, `Registration Date`, `Status Change Date`, `Date Last Changed` | fraction of [1900-01-01, today] |
| `Last Vote Date` | `Last Vote Date Presence` and the fraction |
| `Voter Status` | 1 if `A` |
| withheld fields, `District ...` | dropped |

Each canonical election date gets six columns: `Presence`, `Party D`, `Party R`,
`Party I`, `Voted` and `By Mail`. When a county has no election for a date, the
presence is 0 and the five others are empty.

A date mapped by the county election map but without any slot in the template is
still present, with a blank party and no vote.

A county may hold several contests on the same date. Their slots are merged: for
each voter, the first slot (in template order) with a value provides it.

## Configuration

All the keys are optional. Command line flags take precedence.

```json
{
  "inputDirectory": "PA Voter File 7_15_23",
  "outputDirectory": "processed_data",
  "columnTemplateFile": "PA Voter File 7_15_23/column_mapping.csv",
  "templateColumn": "Field Description",
  "electionMap": { "indexColumn": 1, "descriptionColumn": 2, "dateColumn": 3 },
  "unknownFields": "widen",
  "referenceDate": "2023-07-15",
  "combinedOutputFile": "all_counties.csv",
  "parallel": true
}
```

`unknownFields` decides what happens to a raw field with no transform: `widen`
emits an empty column under its own name, `reject` skips the county.

 */
