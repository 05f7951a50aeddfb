//! The fixed, hand-templated prelude every generated file links against:
//! the `cppmm_string`/`cppmm_string_view` handle pair the type lattice
//! assumes exists (`types::CBuiltin::String`/`StringView`) but which no
//! single binding source file owns. Emitted once per run, not per file.

pub const SUPPORT_HEADER: &str = r#"#ifndef CPPMM_SUPPORT_H_
#define CPPMM_SUPPORT_H_

#include <stddef.h>

#ifdef __cplusplus
extern "C" {
#endif

typedef struct cppmm_string_t cppmm_string;

typedef struct {
    const char* data;
    size_t size;
} cppmm_string_view;

cppmm_string* cppmm_string_new(const char* data, size_t size);
void cppmm_string_free(cppmm_string* self);
const char* cppmm_string_data(const cppmm_string* self);
size_t cppmm_string_size(const cppmm_string* self);

#ifdef __cplusplus
}
#endif

#endif /* CPPMM_SUPPORT_H_ */
"#;

/// C++-only, not part of the public C surface: the definition of the
/// `cppmm_string_t` struct every generated `.cpp` needs in scope to build one
/// out of a `std::string` it got back from the real library.
pub const SUPPORT_INTERNAL_HEADER: &str = r#"#pragma once

#include <string>

struct cppmm_string_t {
    std::string value;
};
"#;

pub const SUPPORT_IMPL: &str = r#"#include "cppmm_support.h"
#include "cppmm_support_internal.hpp"

#include <cstring>

extern "C" {

cppmm_string* cppmm_string_new(const char* data, size_t size) {
    return new cppmm_string_t{std::string(data, size)};
}

void cppmm_string_free(cppmm_string* self) {
    delete self;
}

const char* cppmm_string_data(const cppmm_string* self) {
    return self->value.data();
}

size_t cppmm_string_size(const cppmm_string* self) {
    return self->value.size();
}

}
"#;
